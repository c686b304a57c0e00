// Session cookie cache
// Connector-scoped, shared by every connection attempt from one configuration

use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::types::SessionCookie;

/// Holds the cookie and logon name returned by the last full logon
#[derive(Debug, Default)]
pub struct SessionCookieCache {
    cookie: RwLock<SessionCookie>,

    /// Mirrors `cookie.valid`; only written while the write lock is held
    has_cookie: AtomicBool,
}

impl SessionCookieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current cookie state
    pub async fn get(&self) -> SessionCookie {
        self.cookie.read().await.clone()
    }

    /// Lock-free presence check; a `true` may be stale by the time it is acted on
    pub fn is_valid(&self) -> bool {
        self.has_cookie.load(Ordering::Acquire)
    }

    /// Store a freshly issued cookie and mark it valid
    pub async fn store(&self, logon_name: impl Into<String>, cookie: impl Into<Bytes>) {
        let mut current = self.cookie.write().await;
        current.logon_name = logon_name.into();
        current.cookie = cookie.into();
        current.valid = !current.cookie.is_empty();
        current.established_at = Some(Utc::now());
        self.has_cookie.store(current.valid, Ordering::Release);
        tracing::debug!(logon_name = %current.logon_name, "Stored session cookie");
    }

    /// Drop the cookie bytes; the logon name is kept for the next full logon
    pub async fn invalidate(&self) {
        let mut current = self.cookie.write().await;
        Self::invalidate_locked(&mut current);
        self.has_cookie.store(false, Ordering::Release);
    }

    /// Invalidate only if `rejected` is still the stored cookie.
    ///
    /// Returns `false` when another attempt already replaced or dropped it.
    pub async fn invalidate_if(&self, rejected: &Bytes) -> bool {
        let mut current = self.cookie.write().await;
        if !current.valid || current.cookie != *rejected {
            return false;
        }
        Self::invalidate_locked(&mut current);
        self.has_cookie.store(false, Ordering::Release);
        true
    }

    fn invalidate_locked(cookie: &mut SessionCookie) {
        cookie.cookie = Bytes::new();
        cookie.valid = false;
        cookie.established_at = None;
        tracing::debug!(logon_name = %cookie.logon_name, "Invalidated session cookie");
    }
}
