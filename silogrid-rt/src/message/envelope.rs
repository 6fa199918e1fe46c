// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::error::{CallError, CodecError};
use crate::util::MessageId;

/// Universal request/response envelope.
///
/// An envelope is immutable for the direction it flows: a request fixes its
/// identity fields at creation, and the matching response is a fresh
/// envelope built with [`Envelope::reply_ok`] / [`Envelope::reply_err`],
/// reusing the request's `message_id` so the caller can correlate it.
///
/// # Example
/// ```ignore
/// use silogrid_rt::message::Envelope;
/// use bytes::Bytes;
///
/// let request = Envelope::request("Order", "order-42", "Ship", Bytes::new());
/// let response = request.reply_ok(Bytes::from_static(b"ok"));
/// assert_eq!(response.message_id, request.message_id);
/// assert!(response.is_response);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique id of the request; reused by the response.
    pub message_id: MessageId,

    /// Optional id linking this call to a wider trace.
    pub correlation_id: Option<MessageId>,

    /// Opaque actor id within the type.
    pub actor_id: String,

    /// Fully qualified logical actor type name.
    pub actor_type: String,

    /// Method to invoke on the activation.
    pub method_name: String,

    /// Opaque request parameter bytes (length-prefix framed).
    pub payload: Bytes,

    /// Creation timestamp of this envelope.
    pub timestamp: DateTime<Utc>,

    /// Result bytes, populated on the return direction.
    pub response_payload: Option<Bytes>,

    /// Whether the response carries an error.
    pub is_error: bool,

    /// Wire-coded error kind and detail when `is_error` is set.
    pub error_message: Option<String>,

    /// Marks the return direction explicitly.
    pub is_response: bool,
}

impl Envelope {
    /// Create a request envelope with a fresh `message_id`.
    pub fn request(
        actor_type: impl Into<String>,
        actor_id: impl Into<String>,
        method_name: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            correlation_id: None,
            actor_id: actor_id.into(),
            actor_type: actor_type.into(),
            method_name: method_name.into(),
            payload,
            timestamp: Utc::now(),
            response_payload: None,
            is_error: false,
            error_message: None,
            is_response: false,
        }
    }

    /// Builder method: attach a correlation id for tracing.
    pub fn with_correlation_id(mut self, id: MessageId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Build the success response for this request.
    pub fn reply_ok(&self, response_payload: Bytes) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id,
            actor_id: self.actor_id.clone(),
            actor_type: self.actor_type.clone(),
            method_name: self.method_name.clone(),
            payload: Bytes::new(),
            timestamp: Utc::now(),
            response_payload: Some(response_payload),
            is_error: false,
            error_message: None,
            is_response: true,
        }
    }

    /// Build the error response for this request.
    pub fn reply_err(&self, error: &CallError) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id,
            actor_id: self.actor_id.clone(),
            actor_type: self.actor_type.clone(),
            method_name: self.method_name.clone(),
            payload: Bytes::new(),
            timestamp: Utc::now(),
            response_payload: None,
            is_error: true,
            error_message: Some(error.to_wire()),
            is_response: true,
        }
    }

    /// Whether this envelope is a reply.
    ///
    /// A peer may omit `is_response` on older wire versions; presence of
    /// response fields counts as well.
    pub fn is_reply(&self) -> bool {
        self.is_response || self.response_payload.is_some() || self.error_message.is_some()
    }

    /// Parse the carried error, if any.
    pub fn error(&self) -> Option<CallError> {
        if !self.is_error {
            return None;
        }
        self.error_message
            .as_deref()
            .map(CallError::from_wire)
            .or(Some(CallError::ActorFailure(String::new())))
    }

    /// Encode for the peer stream.
    pub fn to_wire(&self) -> Result<Bytes, CodecError> {
        serde_cbor::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode from a peer stream frame.
    pub fn from_wire(frame: &[u8]) -> Result<Self, CodecError> {
        serde_cbor::from_slice(frame).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
