// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Unique identifier for a request/response pair.
///
/// Every request envelope carries a fresh `MessageId`; the matching response
/// reuses it, which is how callers correlate outstanding calls.
///
/// # Example
/// ```ignore
/// use silogrid_rt::util::MessageId;
///
/// let id1 = MessageId::new();
/// let id2 = MessageId::new();
/// assert_ne!(id1, id2); // Globally unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a silo (a process hosting actor activations).
///
/// Silo ids are operator-assigned strings, stable across restarts of the
/// same logical member. They seed the virtual-node keys of the hash ring,
/// so reusing an id after a restart keeps placement stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiloId(String);

impl SiloId {
    /// Create a silo id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SiloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiloId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SiloId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Cluster-wide identity of an actor: logical type name plus opaque id.
///
/// The pair is globally unique and maps deterministically to one owning
/// silo under the current membership ring. The ring key is the
/// `"type:id"` composite produced by [`ActorKey::ring_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    /// Fully qualified logical type name (e.g. `"orders.Order"`).
    pub actor_type: String,

    /// Opaque actor id within the type (e.g. `"order-42"`).
    pub actor_id: String,
}

impl ActorKey {
    /// Create a new actor key.
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            actor_id: actor_id.into(),
        }
    }

    /// Composite key used for consistent-hash placement.
    pub fn ring_key(&self) -> String {
        format!("{}:{}", self.actor_type, self.actor_id)
    }
}

impl Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}
