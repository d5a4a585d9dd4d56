use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

/// Fixed-window limit applied per subject (client address or account).
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimit {
    pub(crate) scope: &'static str,
    pub(crate) limit: u64,
    pub(crate) window_seconds: u64,
}

impl RateLimit {
    pub(crate) fn key(&self, subject: &str) -> String {
        format!("rl:{}:{}", self.scope, subject.to_ascii_lowercase())
    }
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Returns `true` while the subject is under the limit. Without a connection every
    /// request is allowed.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return Ok(true);
        };

        let current: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit as i64)
    }

    /// Like [`RedisHandle::rate_limit`] but fails open on Redis errors.
    pub(crate) async fn allow(&self, policy: RateLimit, subject: &str) -> bool {
        match self.rate_limit(&policy.key(subject), policy.limit, policy.window_seconds).await {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::warn!(error = %err, scope = policy.scope, "Rate limiter unavailable");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RateLimit, RedisHandle};
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[test]
    fn rate_limit_key_is_scoped_and_normalised() {
        let policy = RateLimit { scope: "login", limit: 5, window_seconds: 60 };
        assert_eq!(policy.key("Ada@Example.com"), "rl:login:ada@example.com");
    }

    #[tokio::test]
    async fn disconnected_handle_allows_everything() {
        let redis = RedisHandle::new("redis://127.0.0.1:1/0".to_string());
        let policy = RateLimit { scope: "test", limit: 0, window_seconds: 1 };
        assert!(redis.allow(policy, "anyone").await);
    }

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn rate_limit_enforces_limit() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        test_support::reset_redis(settings.redis().redis_url()).await.expect("redis reset");

        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = format!("rate-limit:{}", Uuid::new_v4());
        let first = redis.rate_limit(&key, 1, 5).await.expect("rate limit");
        let second = redis.rate_limit(&key, 1, 5).await.expect("rate limit");

        assert!(first);
        assert!(!second);
    }
}
