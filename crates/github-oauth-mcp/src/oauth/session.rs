//! In-memory store for in-flight authorization sessions.
//!
//! Correlates an authorization attempt with its PKCE verifier between
//! the `/oauth/authorize` redirect and the `/oauth/callback` return.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// A pending authorization attempt, keyed by its `state` token.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    /// PKCE verifier to present at token-exchange time.
    pub code_verifier: String,
    /// When the session was created.
    pub created_at: Instant,
    /// When the session stops being resolvable.
    pub expires_at: Instant,
}

impl OAuthSession {
    /// Check if the session has expired at the given time.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory session store.
///
/// Expired entries are removed lazily before authorize/callback
/// processing and by the background sweep task.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, OAuthSession>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Record a pending session.
    ///
    /// An existing live entry under the same state is overwritten: states
    /// carry 32 bytes of entropy, so a colliding insert means the same
    /// caller restarted the flow, and the newest attempt wins.
    pub async fn create(
        &self,
        state: impl Into<String>,
        code_verifier: impl Into<String>,
        ttl: Duration,
    ) {
        let now = Instant::now();
        let session = OAuthSession {
            code_verifier: code_verifier.into(),
            created_at: now,
            expires_at: now + ttl,
        };
        self.sessions.write().await.insert(state.into(), session);
    }

    /// Atomic get-and-remove.
    ///
    /// Removal happens under the write lock, so two concurrent callbacks
    /// presenting the same state cannot both succeed. Expired entries
    /// resolve to `None` and are dropped.
    pub async fn resolve_and_delete(&self, state: &str) -> Option<OAuthSession> {
        let session = self.sessions.write().await.remove(state)?;
        if session.is_expired_at(Instant::now()) {
            return None;
        }
        Some(session)
    }

    /// Remove all sessions whose `expires_at` is at or before `now`.
    ///
    /// Returns the number of sessions removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(count = removed, "Cleaned up expired OAuth sessions");
        }
        removed
    }

    /// Number of live entries, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Start the background sweep task.
    ///
    /// Lazy sweeping alone is unbounded under callback abandonment; the
    /// interval task caps worst-case growth.
    pub fn start_sweep_task(self, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep_expired(Instant::now()).await;
            }
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}
