// Credential refresh capabilities
// One trait per mechanism, selected by which mechanism the server rejected

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::types::{CertKeyPair, MaterialKind};

/// Supplies a new password after a rejection.
///
/// `Ok(None)` means no new material is available. Implementations may be
/// invoked concurrently when registered with more than one connector, so they
/// must be safe for concurrent use.
#[async_trait]
pub trait PasswordRefresher: Send + Sync {
    async fn refresh_password(&self) -> Result<Option<String>>;
}

/// Supplies a new bearer token after a rejection. Same contract as [`PasswordRefresher`].
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self) -> Result<Option<String>>;
}

/// Supplies a new client certificate and key after a rejection. Same contract as [`PasswordRefresher`].
#[async_trait]
pub trait CertificateRefresher: Send + Sync {
    async fn refresh_certificate(&self) -> Result<Option<CertKeyPair>>;
}

// Plain closures work as refreshers; blocking work belongs in an async impl.

#[async_trait]
impl<F> PasswordRefresher for F
where
    F: Fn() -> Result<Option<String>> + Send + Sync,
{
    async fn refresh_password(&self) -> Result<Option<String>> {
        self()
    }
}

#[async_trait]
impl<F> TokenRefresher for F
where
    F: Fn() -> Result<Option<String>> + Send + Sync,
{
    async fn refresh_token(&self) -> Result<Option<String>> {
        self()
    }
}

#[async_trait]
impl<F> CertificateRefresher for F
where
    F: Fn() -> Result<Option<CertKeyPair>> + Send + Sync,
{
    async fn refresh_certificate(&self) -> Result<Option<CertKeyPair>> {
        self()
    }
}

/// A registered refresher, tagged by the material it renews
#[derive(Clone)]
pub enum Refresher {
    Password(Arc<dyn PasswordRefresher>),
    Token(Arc<dyn TokenRefresher>),
    Certificate(Arc<dyn CertificateRefresher>),
}

impl Refresher {
    pub fn kind(&self) -> MaterialKind {
        match self {
            Refresher::Password(_) => MaterialKind::Password,
            Refresher::Token(_) => MaterialKind::Token,
            Refresher::Certificate(_) => MaterialKind::Certificate,
        }
    }
}

impl fmt::Debug for Refresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Refresher::{:?}", self.kind())
    }
}
