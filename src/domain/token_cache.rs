use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::domain::clock::{Clock, TimestampMs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedToken {
    access_token: String,
    token_type: String,
    scope: Option<String>,
    expires_at: TimestampMs,
}

/// Client-credentials tokens keyed by scope.
///
/// A token is served from the cache only while it stays valid for longer
/// than the configured margin. The lock is never held across an await.
pub struct TokenCache {
    clock: Arc<dyn Clock>,
    margin_secs: u64,
    entries: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>, margin_secs: u64) -> Self {
        Self {
            clock,
            margin_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, scope: &str) -> Option<OAuthToken> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;

        let cached = entries.get(scope)?;
        if now.plus_secs(self.margin_secs) >= cached.expires_at {
            entries.remove(scope);
            tracing::debug!(scope, "cached token expired");
            return None;
        }

        Some(OAuthToken {
            access_token: cached.access_token.clone(),
            token_type: cached.token_type.clone(),
            expires_in: now.secs_until(cached.expires_at),
            scope: cached.scope.clone(),
        })
    }

    pub fn insert(&self, scope: &str, token: &OAuthToken) {
        let expires_at = self.clock.now().plus_secs(token.expires_in);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                scope.to_string(),
                CachedToken {
                    access_token: token.access_token.clone(),
                    token_type: token.token_type.clone(),
                    scope: token.scope.clone(),
                    expires_at,
                },
            );
        }
    }

    pub fn invalidate(&self, scope: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OAuthToken, TokenCache};
    use crate::test_support::FixedClock;

    fn token(value: &str, expires_in: u64) -> OAuthToken {
        OAuthToken {
            access_token: value.to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
            scope: Some("viewables:read".to_string()),
        }
    }

    #[test]
    fn serves_token_with_remaining_lifetime() {
        let clock = FixedClock::new(0);
        let cache = TokenCache::new(clock.clone(), 60);

        cache.insert("viewables:read", &token("abc", 3_600));
        clock.advance_secs(600);

        let cached = cache.get("viewables:read").expect("token should be cached");
        assert_eq!(cached.access_token, "abc");
        assert_eq!(cached.expires_in, 3_000);
    }

    #[test]
    fn treats_token_inside_margin_as_expired() {
        let clock = FixedClock::new(0);
        let cache = TokenCache::new(clock.clone(), 60);

        cache.insert("viewables:read", &token("abc", 3_600));
        clock.advance_secs(3_540);

        assert_eq!(cache.get("viewables:read"), None);

        clock.advance_secs(-3_540);
        assert_eq!(cache.get("viewables:read"), None, "expired entry is evicted");
    }

    #[test]
    fn keys_entries_by_scope() {
        let cache = TokenCache::new(FixedClock::new(0), 60);

        cache.insert("viewables:read", &token("viewer", 3_600));
        cache.insert("bucket:create bucket:read", &token("bucket", 3_600));

        assert_eq!(
            cache.get("viewables:read").map(|t| t.access_token),
            Some("viewer".to_string())
        );
        assert_eq!(
            cache.get("bucket:create bucket:read").map(|t| t.access_token),
            Some("bucket".to_string())
        );
        assert_eq!(cache.get("data:read"), None);
    }

    #[test]
    fn invalidate_drops_only_the_given_scope() {
        let cache = TokenCache::new(FixedClock::new(0), 60);

        cache.insert("a", &token("one", 3_600));
        cache.insert("b", &token("two", 3_600));
        cache.invalidate("a");

        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
    }
}
