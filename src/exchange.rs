//! Authentication exchange abstraction.
//!
//! The wire protocol lives behind [`AuthExchange`]: an implementation encodes an
//! [`AuthProposal`], talks to the server and classifies the reply into an
//! [`AuthOutcome`]. The authentication core never performs I/O itself, so the
//! exchange call is its only suspension point on the network.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{AuthOutcome, AuthProposal};

/// Errors raised by the exchange for reasons unrelated to credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(String),

    /// Exchange did not complete in time
    #[error("Exchange timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Server reply could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection went away mid-exchange
    #[error("Connection is closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Sends one authentication request and receives its reply.
///
/// Implementations own framing and must classify server responses:
/// a successful logon becomes [`AuthOutcome::Success`] (carrying the cookie
/// and logon name when the server issued them), a declined mechanism becomes
/// [`AuthOutcome::Rejected`] naming the mechanism the server evaluated, and
/// anything else becomes [`AuthOutcome::TransportFailure`].
#[async_trait]
pub trait AuthExchange: Send + Sync {
    async fn exchange(&self, proposal: &AuthProposal) -> AuthOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Io("connection reset by peer".to_string());
        assert_eq!(err.to_string(), "Network I/O error: connection reset by peer");

        let err = TransportError::Protocol("unexpected segment kind".to_string());
        assert!(err.to_string().contains("unexpected segment kind"));

        assert_eq!(
            TransportError::ConnectionClosed.to_string(),
            "Connection is closed"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = TransportError::from(io);
        assert_eq!(err, TransportError::Io("refused".to_string()));
    }
}
