//! Verified-token cache
//!
//! Resolving a bearer token costs one round trip to the identity service, so
//! verified tokens are remembered for a short TTL. Logout evicts the token.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::AuthUser;
use crate::model::Role;

/// The authenticated caller of an API request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: AuthUser,
    pub role: Role,
}

impl Principal {
    pub fn uid(&self) -> &str {
        &self.user.uid
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

struct CachedSession {
    principal: Principal,
    expires_at: Instant,
}

/// TTL cache from id token to principal
pub struct SessionCache {
    entries: RwLock<HashMap<String, CachedSession>>,
    ttl: Duration,
    max_entries: usize,
}

impl SessionCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Cached principal for a token that has not expired yet
    pub async fn get(&self, token: &str) -> Option<Principal> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.principal.clone())
    }

    /// Remember a verified token
    ///
    /// The entry lives for the cache TTL, or for `token_lifetime` when the
    /// token expires sooner.
    pub async fn insert(
        &self,
        token: &str,
        principal: Principal,
        token_lifetime: Option<Duration>,
    ) {
        let now = Instant::now();
        let lifetime = token_lifetime.map_or(self.ttl, |t| t.min(self.ttl));

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.retain(|_, cached| cached.expires_at > now);
        }
        // Still full: drop the entry closest to expiry
        if entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, cached)| cached.expires_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            token.to_string(),
            CachedSession {
                principal,
                expires_at: now + lifetime,
            },
        );
    }

    /// Forget a token; returns whether it was cached
    pub async fn evict(&self, token: &str) -> bool {
        self.entries.write().await.remove(token).is_some()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(uid: &str) -> Principal {
        Principal {
            user: AuthUser {
                uid: uid.to_string(),
                email: format!("{uid}@example.com"),
            },
            role: Role::Donor,
        }
    }

    #[tokio::test]
    async fn test_insert_get_evict() {
        let cache = SessionCache::default();
        cache.insert("t1", principal("u1"), None).await;

        assert_eq!(cache.get("t1").await.unwrap().uid(), "u1");
        assert!(cache.get("t2").await.is_none());

        assert!(cache.evict("t1").await);
        assert!(!cache.evict("t1").await);
        assert!(cache.get("t1").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_ignored() {
        let cache = SessionCache::new(Duration::from_millis(0), 10);
        cache.insert("t1", principal("u1"), None).await;
        assert!(cache.get("t1").await.is_none());
    }

    #[tokio::test]
    async fn test_entry_never_outlives_its_token() {
        let cache = SessionCache::new(Duration::from_secs(300), 10);
        cache
            .insert("short", principal("u1"), Some(Duration::from_millis(0)))
            .await;
        cache
            .insert("long", principal("u2"), Some(Duration::from_secs(3600)))
            .await;

        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let cache = SessionCache::new(Duration::from_secs(60), 2);
        cache.insert("a", principal("u1"), None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert("b", principal("u2"), None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert("c", principal("u3"), None).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
