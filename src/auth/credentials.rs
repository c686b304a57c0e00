// Credential store
// Shared, lock-guarded authentication material for one connector configuration

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::cookie::SessionCookieCache;
use super::refresher::{CertificateRefresher, PasswordRefresher, Refresher, TokenRefresher};
use super::types::{CertKeyPair, Credentials, Material, MaterialKind};

#[derive(Default)]
struct StoreState {
    credentials: Credentials,
    password_refresher: Option<Arc<dyn PasswordRefresher>>,
    token_refresher: Option<Arc<dyn TokenRefresher>>,
    certificate_refresher: Option<Arc<dyn CertificateRefresher>>,
}

impl StoreState {
    fn snapshot(&self) -> Credentials {
        let mut credentials = self.credentials.clone();
        credentials.has_password_refresher = self.password_refresher.is_some();
        credentials.has_token_refresher = self.token_refresher.is_some();
        credentials.has_certificate_refresher = self.certificate_refresher.is_some();
        credentials
    }

    fn set_refresher(&mut self, refresher: Refresher) {
        match refresher {
            Refresher::Password(r) => self.password_refresher = Some(r),
            Refresher::Token(r) => self.token_refresher = Some(r),
            Refresher::Certificate(r) => self.certificate_refresher = Some(r),
        }
    }

    fn refresher(&self, kind: MaterialKind) -> Option<Refresher> {
        match kind {
            MaterialKind::Password => self.password_refresher.clone().map(Refresher::Password),
            MaterialKind::Token => self.token_refresher.clone().map(Refresher::Token),
            MaterialKind::Certificate => {
                self.certificate_refresher.clone().map(Refresher::Certificate)
            }
        }
    }

    fn apply(&mut self, material: Material) {
        match material {
            Material::Password(p) => self.credentials.password = Some(p),
            Material::Token(t) => self.credentials.token = Some(t),
            Material::Certificate(c) => self.credentials.certificate = Some(c),
            Material::Cookie(_) => {}
        }
    }
}

/// Authentication material shared by all connection attempts of a connector
///
/// Reads take a shared lock so steady-state connections never serialise.
/// Refresh callbacks are never invoked while the lock is held.
pub struct CredentialStore {
    state: RwLock<StoreState>,
    cookies: SessionCookieCache,

    // Serialise refreshes per material kind so concurrent rejections of the
    // same stale value trigger a single callback
    password_gate: Mutex<()>,
    token_gate: Mutex<()>,
    certificate_gate: Mutex<()>,
}

impl CredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            state: RwLock::new(StoreState {
                credentials,
                ..Default::default()
            }),
            cookies: SessionCookieCache::new(),
            password_gate: Mutex::new(()),
            token_gate: Mutex::new(()),
            certificate_gate: Mutex::new(()),
        }
    }

    /// Register a refresher while building the store
    pub fn with_refresher(mut self, refresher: Refresher) -> Self {
        self.state.get_mut().set_refresher(refresher);
        self
    }

    /// Wrap in an `Arc` for sharing across connection attempts
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Copy of the current credentials
    pub async fn get(&self) -> Credentials {
        self.state.read().await.snapshot()
    }

    pub async fn username(&self) -> String {
        self.state.read().await.credentials.username.clone()
    }

    pub async fn password(&self) -> Option<String> {
        self.state.read().await.credentials.password.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.credentials.token.clone()
    }

    pub async fn certificate(&self) -> Option<CertKeyPair> {
        self.state.read().await.credentials.certificate.clone()
    }

    pub async fn set_username(&self, username: impl Into<String>) {
        self.state.write().await.credentials.username = username.into();
    }

    pub async fn set_password(&self, password: impl Into<String>) {
        self.state.write().await.credentials.password = Some(password.into());
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        self.state.write().await.credentials.token = Some(token.into());
    }

    pub async fn set_certificate(&self, certificate: CertKeyPair) {
        self.state.write().await.credentials.certificate = Some(certificate);
    }

    pub async fn clear_password(&self) {
        self.state.write().await.credentials.password = None;
    }

    pub async fn clear_token(&self) {
        self.state.write().await.credentials.token = None;
    }

    pub async fn clear_certificate(&self) {
        self.state.write().await.credentials.certificate = None;
    }

    /// Replace the refresher for the material kind it renews
    pub async fn set_refresher(&self, refresher: Refresher) {
        self.state.write().await.set_refresher(refresher);
    }

    pub async fn set_password_refresher(&self, refresher: Arc<dyn PasswordRefresher>) {
        self.set_refresher(Refresher::Password(refresher)).await;
    }

    pub async fn set_token_refresher(&self, refresher: Arc<dyn TokenRefresher>) {
        self.set_refresher(Refresher::Token(refresher)).await;
    }

    pub async fn set_certificate_refresher(&self, refresher: Arc<dyn CertificateRefresher>) {
        self.set_refresher(Refresher::Certificate(refresher)).await;
    }

    /// Registered refresher for a material kind
    pub async fn refresher(&self, kind: MaterialKind) -> Option<Refresher> {
        self.state.read().await.refresher(kind)
    }

    /// Current stored value for a material kind
    pub async fn material(&self, kind: MaterialKind) -> Option<Material> {
        self.state.read().await.credentials.material(kind)
    }

    /// Store `new` only if the slot still holds `expected` (`None` for an empty slot).
    ///
    /// Returns `false` when another writer changed the value first.
    pub async fn compare_and_set(&self, expected: Option<&Material>, new: Material) -> bool {
        let Some(kind) = new.kind() else {
            return false;
        };
        if expected.is_some_and(|e| e.kind() != Some(kind)) {
            return false;
        }

        let mut state = self.state.write().await;
        if state.credentials.material(kind).as_ref() != expected {
            return false;
        }
        state.apply(new);
        true
    }

    /// Connector-scoped session cookie
    pub fn cookies(&self) -> &SessionCookieCache {
        &self.cookies
    }

    /// Gate held for the duration of a refresh of this material kind
    pub fn refresh_gate(&self, kind: MaterialKind) -> &Mutex<()> {
        match kind {
            MaterialKind::Password => &self.password_gate,
            MaterialKind::Token => &self.token_gate,
            MaterialKind::Certificate => &self.certificate_gate,
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
