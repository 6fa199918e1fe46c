//! Envelope transport between silos.
//!
//! One logical bidirectional stream per peer carries envelopes both ways;
//! requests and responses are told apart by the response fields and
//! correlated by `message_id` through the [`PendingRequests`] table. A
//! send to the local silo never touches the network: it dispatches
//! through the same injected [`EnvelopeReceiver`] and correlates through
//! the same table.

mod correlation;
mod error;
mod remote;
mod traits;

pub use correlation::{PendingGuard, PendingRequests};
pub use error::TransportError;
pub use remote::{ChannelPoolOptions, TcpTransport, TransportOptions};
pub use traits::{EnvelopeReceiver, Transport};
