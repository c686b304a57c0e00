use std::sync::Arc;

use super::credentials::CredentialStore;
use super::refresh::RefreshCoordinator;
use super::selector::MethodSelector;
use super::types::{AuthOutcome, AuthProposal, SessionContext};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::exchange::AuthExchange;

/// Authentication manager
/// Connector-scoped entry point shared by every connection attempt of one configuration
#[derive(Debug, Clone)]
pub struct AuthManager {
    /// Shared credentials and session cookie
    store: Arc<CredentialStore>,

    coordinator: RefreshCoordinator,
}

impl AuthManager {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self::with_selector(store, MethodSelector::default())
    }

    pub fn with_selector(store: Arc<CredentialStore>, selector: MethodSelector) -> Self {
        Self {
            coordinator: RefreshCoordinator::new(store.clone(), selector),
            store,
        }
    }

    /// Create a manager from loaded configuration
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let selector = MethodSelector::new(config.password_token_fallback);
        Ok(Self::with_selector(config.to_store()?.shared(), selector))
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Proposal the next attempt would offer
    pub async fn proposal(&self) -> AuthProposal {
        self.coordinator.proposal().await
    }

    /// Authenticate one connection attempt through `exchange`.
    ///
    /// Fails fast with [`AuthError::Configuration`] when no mechanism is
    /// usable; the exchange is not called in that case.
    pub async fn authenticate(&self, exchange: &dyn AuthExchange) -> Result<SessionContext> {
        let proposal = self.coordinator.proposal().await;
        if proposal.is_empty() {
            return Err(AuthError::Configuration(
                "no usable authentication mechanism (need a password, token, certificate or session cookie)"
                    .to_string(),
            ));
        }

        tracing::debug!(
            logon_name = %proposal.logon_name,
            mechanisms = ?proposal.mechanisms(),
            "Authenticating"
        );

        match self.coordinator.attempt_with_refresh(proposal, exchange).await {
            AuthOutcome::Success(context) => Ok(context),
            AuthOutcome::Rejected(rejection) => Err(AuthError::Rejected {
                mechanism: rejection.mechanism,
                reason: rejection.reason,
                refresh_error: rejection.refresh_error,
            }),
            AuthOutcome::TransportFailure(e) => Err(AuthError::Transport(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{Credentials, Mechanism};
    use crate::exchange::TransportError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Exchange {}

        #[async_trait]
        impl AuthExchange for Exchange {
            async fn exchange(&self, proposal: &AuthProposal) -> AuthOutcome;
        }
    }

    #[tokio::test]
    async fn test_empty_configuration_fails_fast() {
        let manager = AuthManager::new(CredentialStore::new(Credentials::new("admin")).shared());

        let mut exchange = MockExchange::new();
        exchange.expect_exchange().never();

        let err = manager.authenticate(&exchange).await.unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_success_maps_to_context() {
        let manager = AuthManager::new(
            CredentialStore::new(Credentials::new("admin").with_password("secret")).shared(),
        );

        let mut exchange = MockExchange::new();
        exchange
            .expect_exchange()
            .times(1)
            .withf(|p| p.mechanisms() == vec![Mechanism::Password])
            .returning(|p| {
                AuthOutcome::Success(SessionContext {
                    mechanism: Mechanism::Password,
                    logon_name: p.logon_name.clone(),
                    session_cookie: None,
                })
            });

        let context = manager.authenticate(&exchange).await.unwrap();
        assert_eq!(context.logon_name, "admin");
        assert_eq!(context.mechanism, Mechanism::Password);
    }

    #[tokio::test]
    async fn test_rejection_maps_to_error() {
        let manager = AuthManager::new(
            CredentialStore::new(Credentials::new("admin").with_password("wrong")).shared(),
        );

        let mut exchange = MockExchange::new();
        exchange
            .expect_exchange()
            .times(1)
            .returning(|_| AuthOutcome::rejected(Mechanism::Password, "invalid credentials"));

        let err = manager.authenticate(&exchange).await.unwrap_err();
        assert_eq!(err.mechanism(), Some(Mechanism::Password));
        assert!(err.to_string().contains("invalid credentials"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_error() {
        let manager = AuthManager::new(
            CredentialStore::new(Credentials::new("admin").with_password("secret")).shared(),
        );

        let mut exchange = MockExchange::new();
        exchange
            .expect_exchange()
            .times(1)
            .returning(|_| AuthOutcome::TransportFailure(TransportError::Timeout { timeout_ms: 100 }));

        let err = manager.authenticate(&exchange).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            AuthError::Transport(TransportError::Timeout { timeout_ms: 100 })
        ));
    }

    #[tokio::test]
    async fn test_managers_share_store() {
        let store = CredentialStore::new(Credentials::new("admin").with_password("a")).shared();
        let first = AuthManager::new(store.clone());
        let second = first.clone();

        second.store().set_password("b").await;
        assert_eq!(first.store().password().await.as_deref(), Some("b"));
        assert!(Arc::ptr_eq(first.store(), second.store()));
    }

    #[tokio::test]
    async fn test_separate_connectors_are_isolated() {
        let first = AuthManager::new(
            CredentialStore::new(Credentials::new("admin").with_password("secret")).shared(),
        );
        let second = AuthManager::new(
            CredentialStore::new(Credentials::new("admin").with_password("secret")).shared(),
        );

        first.store().cookies().store("ADMIN", b"cookie".to_vec()).await;

        assert_eq!(first.proposal().await.mechanisms()[0], Mechanism::SessionCookie);
        assert_eq!(second.proposal().await.mechanisms(), vec![Mechanism::Password]);
    }
}
