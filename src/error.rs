// Error handling module
// Defines authentication error types surfaced to connection callers

use thiserror::Error;

use crate::auth::Mechanism;
use crate::exchange::TransportError;

/// Errors surfaced by a connection attempt's authentication phase
#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable authentication mechanism could be resolved
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server declined the named mechanism, after refresh-and-retry if applicable
    #[error("Authentication failed ({mechanism}): {reason}{}", refresh_suffix(.refresh_error))]
    Rejected {
        mechanism: Mechanism,
        reason: String,
        refresh_error: Option<String>,
    },

    /// Exchange failed for reasons unrelated to credentials
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn refresh_suffix(refresh_error: &Option<String>) -> String {
    match refresh_error {
        Some(e) => format!(" (refresh failed: {})", e),
        None => String::new(),
    }
}

impl AuthError {
    /// Whether the caller's own retry/backoff policy may reasonably try again.
    /// Credential and configuration failures are final from this layer's view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }

    /// Mechanism named by a rejection
    pub fn mechanism(&self) -> Option<Mechanism> {
        match self {
            AuthError::Rejected { mechanism, .. } => Some(*mechanism),
            _ => None,
        }
    }
}

/// Invalid credential material
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("client certificate is empty")]
    EmptyCertificate,

    #[error("client key is empty")]
    EmptyKey,
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthError::Configuration("no password, token or certificate".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: no password, token or certificate"
        );

        let err = AuthError::Rejected {
            mechanism: Mechanism::Password,
            reason: "invalid username or password".to_string(),
            refresh_error: None,
        };
        assert_eq!(
            err.to_string(),
            "Authentication failed (password): invalid username or password"
        );
    }

    #[test]
    fn test_rejected_with_refresh_error() {
        let err = AuthError::Rejected {
            mechanism: Mechanism::Token,
            reason: "token expired".to_string(),
            refresh_error: Some("identity provider unreachable".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("token expired"));
        assert!(msg.contains("refresh failed: identity provider unreachable"));
        assert_eq!(err.mechanism(), Some(Mechanism::Token));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err = AuthError::from(TransportError::Timeout { timeout_ms: 5000 });
        assert_eq!(err.to_string(), "Exchange timed out after 5000ms");
        assert!(err.is_retryable());
        assert_eq!(err.mechanism(), None);
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(!AuthError::Configuration("x".to_string()).is_retryable());
        assert!(!AuthError::Rejected {
            mechanism: Mechanism::Certificate,
            reason: "x".to_string(),
            refresh_error: None,
        }
        .is_retryable());
    }

    #[test]
    fn test_credential_error_messages() {
        assert_eq!(
            CredentialError::EmptyCertificate.to_string(),
            "client certificate is empty"
        );
        assert_eq!(CredentialError::EmptyKey.to_string(), "client key is empty");
    }
}
