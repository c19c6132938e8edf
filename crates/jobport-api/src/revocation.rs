//! Token revocation registry.
//!
//! Logged-out tokens are held in an in-process expiring set until their
//! natural expiry; after that the verifier rejects them on its own, so the
//! entry is dropped. Single-process only: the registry does not survive
//! restarts and does not coordinate across instances.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;

/// Hard cap on tracked tokens. At one entry per logout this is far above
/// any plausible single-instance load; crossing it forces an early sweep.
const MAX_ENTRIES: usize = 100_000;

/// Concurrency-safe expiring set of revoked token values.
pub struct RevocationRegistry {
    entries: RwLock<HashMap<String, Instant>>,
    /// Per-entry lifetime; set to the token maximum lifetime so entries
    /// never outlive the tokens they block.
    ttl: Duration,
}

impl RevocationRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Mark a token unusable until its natural expiry.
    pub async fn revoke(&self, token: impl Into<String>) {
        let mut entries = self.entries.write().await;

        if entries.len() >= MAX_ENTRIES {
            let now = Instant::now();
            entries.retain(|_, expires| *expires > now);
            if entries.len() >= MAX_ENTRIES {
                // Still full of live entries; drop the soonest-to-expire
                // to keep the map bounded.
                warn!("Revocation registry at capacity, evicting oldest entries");
                let mut by_expiry: Vec<(String, Instant)> =
                    entries.iter().map(|(t, e)| (t.clone(), *e)).collect();
                by_expiry.sort_by_key(|(_, e)| *e);
                for (token, _) in by_expiry.into_iter().take(MAX_ENTRIES / 10) {
                    entries.remove(&token);
                }
            }
        }

        entries.insert(token.into(), Instant::now() + self.ttl);
    }

    /// Check membership. Expired entries count as absent.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let entries = self.entries.read().await;
        match entries.get(token) {
            Some(expires) => *expires > Instant::now(),
            None => false,
        }
    }

    /// Drop expired entries. Called periodically from a background tick.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, expires| *expires > now);
        before - entries.len()
    }

    /// Number of tracked entries, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let registry = RevocationRegistry::new(Duration::from_secs(60));
        assert!(!registry.is_revoked("tok-a").await);

        registry.revoke("tok-a").await;
        assert!(registry.is_revoked("tok-a").await);
        assert!(!registry.is_revoked("tok-b").await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let registry = RevocationRegistry::new(Duration::from_millis(10));
        registry.revoke("tok-a").await;
        assert!(registry.is_revoked("tok-a").await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!registry.is_revoked("tok-a").await);

        assert_eq!(registry.sweep().await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_entries() {
        let registry = RevocationRegistry::new(Duration::from_secs(60));
        registry.revoke("tok-a").await;
        registry.revoke("tok-b").await;

        assert_eq!(registry.sweep().await, 0);
        assert_eq!(registry.len().await, 2);
    }
}
