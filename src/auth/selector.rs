// Authentication method selection
// Builds the ordered proposal offered to the server in one exchange

use once_cell::sync::Lazy;

use super::types::{AuthMethod, AuthProposal, Credentials, SessionCookie, TokenSource};

/// Prefix of a base64url-encoded JWT header (`{"` encodes to `ey`)
pub const JWT_PREFIX: &str = "ey";

/// Identifies this process to the server; session cookies are bound to it
static CLIENT_ID: Lazy<String> = Lazy::new(|| {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}@{}", std::process::id(), host)
});

pub fn client_id() -> &'static str {
    &CLIENT_ID
}

/// Whether a string is shaped like a JWT
pub fn looks_like_jwt(value: &str) -> bool {
    value.starts_with(JWT_PREFIX)
}

/// Chooses which mechanisms to offer and in what order
///
/// Priority: session cookie, certificate, token, basic password.
/// Every mechanism with usable material is included; the server picks.
#[derive(Debug, Clone, Copy)]
pub struct MethodSelector {
    /// Compatibility shim: offer a JWT-shaped password as a token when neither
    /// a username nor an explicit token is configured. Mirrors drivers that let
    /// callers pass a token through the password field.
    pub password_token_fallback: bool,
}

impl Default for MethodSelector {
    fn default() -> Self {
        Self {
            password_token_fallback: true,
        }
    }
}

impl MethodSelector {
    pub fn new(password_token_fallback: bool) -> Self {
        Self {
            password_token_fallback,
        }
    }

    /// Build a proposal from a credential snapshot and the cookie state.
    ///
    /// An empty proposal means nothing is usable and the caller must fail
    /// without contacting the server.
    pub fn build_proposal(&self, credentials: &Credentials, cookie: &SessionCookie) -> AuthProposal {
        let mut methods = Vec::with_capacity(4);

        if cookie.is_usable() {
            methods.push(AuthMethod::SessionCookie {
                logon_name: cookie.logon_name.clone(),
                cookie: cookie.cookie.clone(),
                client_id: client_id().to_string(),
            });
        }

        if let Some(certificate) = &credentials.certificate {
            methods.push(AuthMethod::Certificate(certificate.clone()));
        }

        let token = credentials.token.as_deref().filter(|t| !t.is_empty());
        let password = credentials.password.as_deref().filter(|p| !p.is_empty());

        match (token, password) {
            (Some(token), _) => methods.push(AuthMethod::Token {
                token: token.to_string(),
                source: TokenSource::Explicit,
            }),
            (None, Some(password))
                if self.password_token_fallback
                    && credentials.username.is_empty()
                    && looks_like_jwt(password) =>
            {
                methods.push(AuthMethod::Token {
                    token: password.to_string(),
                    source: TokenSource::PasswordField,
                })
            }
            _ => {}
        }

        if let Some(password) = password {
            methods.push(AuthMethod::Password {
                username: credentials.username.clone(),
                password: password.to_string(),
            });
        }

        AuthProposal {
            logon_name: credentials.username.clone(),
            methods,
        }
    }
}
