// Authentication module
// Negotiates logon mechanisms, refreshes credentials and caches session cookies

mod cookie;
mod credentials;
mod manager;
mod refresh;
mod refresher;
mod selector;
mod types;

pub use cookie::SessionCookieCache;
pub use credentials::CredentialStore;
pub use manager::AuthManager;
pub use refresh::RefreshCoordinator;
pub use refresher::{CertificateRefresher, PasswordRefresher, Refresher, TokenRefresher};
pub use selector::{client_id, looks_like_jwt, MethodSelector, JWT_PREFIX};
pub use types::{
    AuthMethod, AuthOutcome, AuthProposal, CertKeyPair, Credentials, Material, MaterialKind,
    Mechanism, Rejection, SessionContext, SessionCookie, TokenSource,
};
