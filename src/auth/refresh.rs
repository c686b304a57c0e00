// Refresh-and-retry coordination
// Recovers from a rejected mechanism by renewing its material at most once

use std::sync::Arc;

use super::credentials::CredentialStore;
use super::refresher::Refresher;
use super::selector::MethodSelector;
use super::types::{
    AuthOutcome, AuthProposal, Material, MaterialKind, Mechanism, Rejection, SessionContext,
    SessionCookie,
};
use crate::exchange::AuthExchange;

/// What recovery decided after a rejection
#[derive(Debug, Clone, PartialEq, Eq)]
enum Recovery {
    /// Material changed (by us or a concurrent attempt); retry once
    Retry,
    /// Nothing to retry with
    GiveUp,
    /// Refresher errored; treated as no new material
    Failed(String),
}

/// Runs an exchange and, on rejection, renews the rejected material and retries once
///
/// Many attempts failing on the same stale value share one refresh: the first
/// to take the mechanism's refresh gate invokes the refresher, later ones find
/// the stored value already changed and retry without calling it again.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    selector: MethodSelector,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, selector: MethodSelector) -> Self {
        Self { store, selector }
    }

    /// Proposal from the store's current state
    pub async fn proposal(&self) -> AuthProposal {
        let credentials = self.store.get().await;
        let cookie = if self.store.cookies().is_valid() {
            self.store.cookies().get().await
        } else {
            SessionCookie::default()
        };
        self.selector.build_proposal(&credentials, &cookie)
    }

    /// Proposal for a full logon, never carrying the session cookie
    async fn logon_proposal(&self) -> AuthProposal {
        let credentials = self.store.get().await;
        self.selector.build_proposal(&credentials, &SessionCookie::default())
    }

    /// Authenticate with `proposal`, recovering from one rejection.
    ///
    /// A rejected session cookie is dropped first and followed by a full logon,
    /// which still gets its own refresh and single retry.
    pub async fn attempt_with_refresh(
        &self,
        proposal: AuthProposal,
        exchange: &dyn AuthExchange,
    ) -> AuthOutcome {
        let rejection = match self.exchange_once(&proposal, exchange).await {
            Ok(outcome) => return outcome,
            Err(rejection) => rejection,
        };

        if rejection.mechanism != Mechanism::SessionCookie
            || proposal.method(Mechanism::SessionCookie).is_none()
        {
            return self.refresh_and_retry(&proposal, rejection, exchange).await;
        }

        self.drop_cookie(&proposal).await;
        let logon = self.logon_proposal().await;
        if logon.is_empty() {
            return AuthOutcome::Rejected(rejection);
        }

        tracing::debug!(
            mechanisms = ?logon.mechanisms(),
            "Session cookie rejected, falling back to full logon"
        );

        match self.exchange_once(&logon, exchange).await {
            Ok(outcome) => outcome,
            Err(rejection) => self.refresh_and_retry(&logon, rejection, exchange).await,
        }
    }

    /// One exchange; a rejection comes back as `Err` for recovery
    async fn exchange_once(
        &self,
        proposal: &AuthProposal,
        exchange: &dyn AuthExchange,
    ) -> Result<AuthOutcome, Rejection> {
        match exchange.exchange(proposal).await {
            AuthOutcome::Success(context) => {
                self.record_session(proposal, &context).await;
                Ok(AuthOutcome::Success(context))
            }
            AuthOutcome::Rejected(rejection) => {
                tracing::debug!(
                    mechanism = %rejection.mechanism,
                    reason = %rejection.reason,
                    "Authentication rejected"
                );
                Err(rejection)
            }
            failure => Ok(failure),
        }
    }

    async fn refresh_and_retry(
        &self,
        proposal: &AuthProposal,
        rejection: Rejection,
        exchange: &dyn AuthExchange,
    ) -> AuthOutcome {
        match self.recover(proposal, &rejection).await {
            Recovery::Retry => {}
            Recovery::GiveUp => return AuthOutcome::Rejected(rejection),
            Recovery::Failed(err) => {
                return AuthOutcome::Rejected(Rejection {
                    refresh_error: Some(err),
                    ..rejection
                })
            }
        }

        let retry = self.logon_proposal().await;
        if retry.is_empty() {
            return AuthOutcome::Rejected(rejection);
        }

        tracing::debug!(mechanisms = ?retry.mechanisms(), "Retrying authentication");

        match self.exchange_once(&retry, exchange).await {
            Ok(outcome) => outcome,
            Err(second) => AuthOutcome::Rejected(second),
        }
    }

    async fn recover(&self, proposal: &AuthProposal, rejection: &Rejection) -> Recovery {
        let Some(method) = proposal.method(rejection.mechanism) else {
            // Server named a mechanism we never offered
            return Recovery::GiveUp;
        };

        let rejected = method.material();
        let Some(kind) = rejected.kind() else {
            return Recovery::GiveUp;
        };

        // Runs detached so a cancelled attempt still commits a completed refresh
        let handle = tokio::spawn(refresh_material(
            self.store.clone(),
            kind,
            rejected,
            method.stored_material(),
        ));
        match handle.await {
            Ok(recovery) => recovery,
            Err(e) => Recovery::Failed(format!("refresh task failed: {}", e)),
        }
    }

    async fn drop_cookie(&self, proposal: &AuthProposal) {
        if let Some(Material::Cookie(cookie)) = proposal
            .method(Mechanism::SessionCookie)
            .map(|m| m.material())
        {
            self.store.cookies().invalidate_if(&cookie).await;
        }
    }

    async fn record_session(&self, proposal: &AuthProposal, context: &SessionContext) {
        if context.mechanism == Mechanism::SessionCookie {
            return;
        }
        let Some(cookie) = context.session_cookie.as_ref().filter(|c| !c.is_empty()) else {
            return;
        };

        let logon_name = if context.logon_name.is_empty() {
            &proposal.logon_name
        } else {
            &context.logon_name
        };
        self.store.cookies().store(logon_name.clone(), cookie.clone()).await;
    }
}

/// Renew `rejected` unless someone already did, holding the kind's refresh gate
///
/// `stored` is the slot value the rejected entry was built from; the refreshed
/// value only replaces it if the slot still holds it.
async fn refresh_material(
    store: Arc<CredentialStore>,
    kind: MaterialKind,
    rejected: Material,
    stored: Option<Material>,
) -> Recovery {
    let _gate = store.refresh_gate(kind).lock().await;

    if store.material(kind).await != stored {
        tracing::debug!(?kind, "Credential already refreshed by another attempt");
        return Recovery::Retry;
    }

    let Some(refresher) = store.refresher(kind).await else {
        tracing::debug!(?kind, "No refresher registered");
        return Recovery::GiveUp;
    };

    // Store lock is released here; the refresher may read the store
    let refreshed = match refresher {
        Refresher::Password(r) => r.refresh_password().await.map(|p| p.map(Material::Password)),
        Refresher::Token(r) => r.refresh_token().await.map(|t| t.map(Material::Token)),
        Refresher::Certificate(r) => r
            .refresh_certificate()
            .await
            .map(|c| c.map(Material::Certificate)),
    };

    match refreshed {
        Ok(Some(new)) if new != rejected => {
            if store.compare_and_set(stored.as_ref(), new).await {
                tracing::debug!(?kind, "Credential refreshed");
            } else {
                tracing::debug!(?kind, "Credential changed during refresh, keeping stored value");
            }
            Recovery::Retry
        }
        Ok(_) => {
            tracing::debug!(?kind, "Refresher returned no new material");
            Recovery::GiveUp
        }
        Err(e) => {
            tracing::debug!(?kind, error = %e, "Credential refresher failed");
            Recovery::Failed(format!("{:#}", e))
        }
    }
}
