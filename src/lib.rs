// hdb-auth - connection authentication core for HANA-style database clients

pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;

pub use auth::{AuthManager, CredentialStore, Mechanism};
pub use config::AuthConfig;
pub use error::{AuthError, CredentialError};
pub use exchange::{AuthExchange, TransportError};
