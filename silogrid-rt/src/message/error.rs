//! Call error kinds exchanged over the envelope.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors surfaced to a caller through a response envelope.
///
/// The envelope carries these as `is_error = true` plus a stable wire code
/// in `error_message` (`"code: detail"`), so the kind survives the hop
/// between silos and parses back on the caller side.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    /// Send deadline elapsed before a response arrived.
    #[error("timeout")]
    Timeout,

    /// The caller canceled the request.
    #[error("canceled")]
    Canceled,

    /// No factory or dispatcher is registered for the actor type.
    #[error("unknown-actor-type: {0}")]
    UnknownActorType(String),

    /// The dispatcher has no method with that name.
    #[error("unknown-method: {actor_type}::{method}")]
    UnknownMethod {
        /// Actor type the call addressed.
        actor_type: String,
        /// Method name that failed to resolve.
        method: String,
    },

    /// Parameter framing or converter violation.
    #[error("malformed-payload: {0}")]
    MalformedPayload(String),

    /// Optimistic concurrency check-and-set failed.
    #[error("concurrency-conflict: expected {expected:?}, actual {actual:?}")]
    ConcurrencyConflict {
        /// Version the writer expected to find.
        expected: Option<i64>,
        /// Version actually stored.
        actual: Option<i64>,
    },

    /// Rate limiter rejected the message (excess action `Reject`).
    #[error("rate-limited")]
    RateLimited,

    /// Circuit breaker rejected the message.
    #[error("circuit-open")]
    CircuitOpen,

    /// User code failed after retry exhaustion.
    #[error("actor-failure: {0}")]
    ActorFailure(String),

    /// A supervised child exceeded its restart budget.
    #[error("supervisor-escalation: {0}")]
    SupervisorEscalation(String),
}

impl CallError {
    /// Stable wire code for this kind.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
            Self::UnknownActorType(_) => "unknown-actor-type",
            Self::UnknownMethod { .. } => "unknown-method",
            Self::MalformedPayload(_) => "malformed-payload",
            Self::ConcurrencyConflict { .. } => "concurrency-conflict",
            Self::RateLimited => "rate-limited",
            Self::CircuitOpen => "circuit-open",
            Self::ActorFailure(_) => "actor-failure",
            Self::SupervisorEscalation(_) => "supervisor-escalation",
        }
    }

    /// Encode for the `error_message` envelope field.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }

    /// Parse an `error_message` back into a kind.
    ///
    /// Unrecognized codes decode as [`CallError::ActorFailure`] carrying the
    /// raw message, so a newer peer never breaks an older caller.
    pub fn from_wire(message: &str) -> Self {
        let (code, detail) = match message.split_once(':') {
            Some((code, detail)) => (code.trim(), detail.trim()),
            None => (message.trim(), ""),
        };

        match code {
            "timeout" => Self::Timeout,
            "canceled" => Self::Canceled,
            "unknown-actor-type" => Self::UnknownActorType(detail.to_string()),
            "unknown-method" => {
                let (actor_type, method) = detail.split_once("::").unwrap_or((detail, ""));
                Self::UnknownMethod {
                    actor_type: actor_type.to_string(),
                    method: method.to_string(),
                }
            }
            "malformed-payload" => Self::MalformedPayload(detail.to_string()),
            "concurrency-conflict" => {
                // Versions are informational on the wire; callers re-read anyway.
                Self::ConcurrencyConflict {
                    expected: parse_version(detail, "expected"),
                    actual: parse_version(detail, "actual"),
                }
            }
            "rate-limited" => Self::RateLimited,
            "circuit-open" => Self::CircuitOpen,
            "actor-failure" => Self::ActorFailure(detail.to_string()),
            "supervisor-escalation" => Self::SupervisorEscalation(detail.to_string()),
            _ => Self::ActorFailure(message.to_string()),
        }
    }

    /// Whether the caller may reasonably retry or back off and retry.
    ///
    /// Transport-level code never retries on these; the classification is
    /// for application callers deciding what to do with a failed call.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. }
                | Self::RateLimited
                | Self::CircuitOpen
                | Self::ActorFailure(_)
        )
    }
}

fn parse_version(detail: &str, label: &str) -> Option<i64> {
    // Parses "expected Some(1), actual Some(2)" style details leniently.
    // Only the comma-delimited segment after the label is considered, so
    // "expected None" never borrows digits from the other field.
    let idx = detail.find(label)?;
    let tail = &detail[idx + label.len()..];
    let segment = tail.split(',').next()?;
    let digits: String = segment
        .chars()
        .skip_while(|c| !c.is_ascii_digit() && *c != '-')
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse().ok()
}

/// Envelope wire codec failure (CBOR encode/decode).
#[derive(Error, Debug)]
pub enum CodecError {
    /// Envelope failed to serialize.
    #[error("envelope encode failed: {0}")]
    Encode(String),

    /// Inbound frame did not decode as an envelope.
    #[error("envelope decode failed: {0}")]
    Decode(String),
}
