// Authentication types

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::CredentialError;
use crate::exchange::TransportError;

/// One authentication method the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// Server-issued session cookie from an earlier logon
    SessionCookie,
    /// X.509 client certificate and key
    Certificate,
    /// JWT bearer token
    Token,
    /// Basic username/password
    Password,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::SessionCookie => write!(f, "session cookie"),
            Mechanism::Certificate => write!(f, "certificate"),
            Mechanism::Token => write!(f, "token"),
            Mechanism::Password => write!(f, "password"),
        }
    }
}

/// Client certificate and private key, compared by content
#[derive(Clone, PartialEq, Eq)]
pub struct CertKeyPair {
    cert: Bytes,
    key: Bytes,
}

impl CertKeyPair {
    pub fn new(cert: impl Into<Bytes>, key: impl Into<Bytes>) -> Result<Self, CredentialError> {
        let cert = cert.into();
        let key = key.into();
        if cert.is_empty() {
            return Err(CredentialError::EmptyCertificate);
        }
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        Ok(Self { cert, key })
    }

    pub fn cert(&self) -> &Bytes {
        &self.cert
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl fmt::Debug for CertKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertKeyPair")
            .field("cert_len", &self.cert.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Snapshot of the configured credential material
///
/// Refreshers are not part of the snapshot, only whether one is registered.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub certificate: Option<CertKeyPair>,
    pub token: Option<String>,

    pub has_password_refresher: bool,
    pub has_certificate_refresher: bool,
    pub has_token_refresher: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_certificate(mut self, certificate: CertKeyPair) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Current value for a material kind
    pub fn material(&self, kind: MaterialKind) -> Option<Material> {
        match kind {
            MaterialKind::Password => self.password.clone().map(Material::Password),
            MaterialKind::Token => self.token.clone().map(Material::Token),
            MaterialKind::Certificate => self.certificate.clone().map(Material::Certificate),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("certificate", &self.certificate)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("has_password_refresher", &self.has_password_refresher)
            .field("has_certificate_refresher", &self.has_certificate_refresher)
            .field("has_token_refresher", &self.has_token_refresher)
            .finish()
    }
}

/// Session cookie issued by the server after a full logon
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCookie {
    /// Database user the cookie belongs to; kept across invalidation
    pub logon_name: String,
    pub cookie: Bytes,
    pub valid: bool,
    pub established_at: Option<DateTime<Utc>>,
}

impl SessionCookie {
    /// Whether the cookie can be offered to the server
    pub fn is_usable(&self) -> bool {
        self.valid && !self.logon_name.is_empty() && !self.cookie.is_empty()
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("logon_name", &self.logon_name)
            .field("cookie", &"<redacted>")
            .field("valid", &self.valid)
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// Where a token entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Configured as a token
    Explicit,
    /// Password value shaped like a JWT, offered as a token for compatibility
    PasswordField,
}

/// One entry of a proposal, carrying the material it will be tried with
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    SessionCookie {
        logon_name: String,
        cookie: Bytes,
        client_id: String,
    },
    Certificate(CertKeyPair),
    Token {
        token: String,
        source: TokenSource,
    },
    Password {
        username: String,
        password: String,
    },
}

impl AuthMethod {
    pub fn mechanism(&self) -> Mechanism {
        match self {
            AuthMethod::SessionCookie { .. } => Mechanism::SessionCookie,
            AuthMethod::Certificate(_) => Mechanism::Certificate,
            AuthMethod::Token { .. } => Mechanism::Token,
            AuthMethod::Password { .. } => Mechanism::Password,
        }
    }

    /// The material sent with this entry
    pub fn material(&self) -> Material {
        match self {
            AuthMethod::SessionCookie { cookie, .. } => Material::Cookie(cookie.clone()),
            AuthMethod::Certificate(pair) => Material::Certificate(pair.clone()),
            AuthMethod::Token { token, .. } => Material::Token(token.clone()),
            AuthMethod::Password { password, .. } => Material::Password(password.clone()),
        }
    }

    /// What the store's slot for this entry's material held when it was built.
    ///
    /// A password-field token is only offered while the token slot is empty.
    pub fn stored_material(&self) -> Option<Material> {
        match self {
            AuthMethod::Token {
                source: TokenSource::PasswordField,
                ..
            } => None,
            method => Some(method.material()),
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::SessionCookie {
                logon_name,
                client_id,
                ..
            } => f
                .debug_struct("SessionCookie")
                .field("logon_name", logon_name)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            AuthMethod::Certificate(pair) => f.debug_tuple("Certificate").field(pair).finish(),
            AuthMethod::Token { source, .. } => f
                .debug_struct("Token")
                .field("source", source)
                .finish_non_exhaustive(),
            AuthMethod::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Ordered mechanisms offered to the server in one exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthProposal {
    pub logon_name: String,
    pub methods: Vec<AuthMethod>,
}

impl AuthProposal {
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn mechanisms(&self) -> Vec<Mechanism> {
        self.methods.iter().map(AuthMethod::mechanism).collect()
    }

    /// The entry offered for a mechanism, if any
    pub fn method(&self, mechanism: Mechanism) -> Option<&AuthMethod> {
        self.methods.iter().find(|m| m.mechanism() == mechanism)
    }
}

/// Kind of refreshable material held by the credential store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Password,
    Token,
    Certificate,
}

/// A concrete credential value, used to detect whether it changed
#[derive(Clone, PartialEq, Eq)]
pub enum Material {
    Password(String),
    Token(String),
    Certificate(CertKeyPair),
    Cookie(Bytes),
}

impl Material {
    /// Store slot this material lives in; cookies live in the cookie cache
    pub fn kind(&self) -> Option<MaterialKind> {
        match self {
            Material::Password(_) => Some(MaterialKind::Password),
            Material::Token(_) => Some(MaterialKind::Token),
            Material::Certificate(_) => Some(MaterialKind::Certificate),
            Material::Cookie(_) => None,
        }
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Material::Password(_) => "Password",
            Material::Token(_) => "Token",
            Material::Certificate(_) => "Certificate",
            Material::Cookie(_) => "Cookie",
        };
        write!(f, "{}(<redacted>)", name)
    }
}

/// Session established by a successful exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Mechanism the server accepted
    pub mechanism: Mechanism,
    /// Database user the session runs as
    pub logon_name: String,
    /// Cookie for fast reconnection, when the server issued one
    pub session_cookie: Option<Bytes>,
}

/// Server refusal of a specific mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub mechanism: Mechanism,
    pub reason: String,
    /// Set when a refresher was consulted and failed
    pub refresh_error: Option<String>,
}

impl Rejection {
    pub fn new(mechanism: Mechanism, reason: impl Into<String>) -> Self {
        Self {
            mechanism,
            reason: reason.into(),
            refresh_error: None,
        }
    }
}

/// Result of one authentication exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(SessionContext),
    Rejected(Rejection),
    TransportFailure(TransportError),
}

impl AuthOutcome {
    pub fn rejected(mechanism: Mechanism, reason: impl Into<String>) -> Self {
        AuthOutcome::Rejected(Rejection::new(mechanism, reason))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }
}
