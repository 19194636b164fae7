use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, AsyncCommands, Client, RedisError};
use tokio::sync::RwLock;

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

/// Outcome of a lock attempt. `Unavailable` means Redis is not connected and the
/// caller should fall back to database-level guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockOutcome {
    Acquired,
    Held,
    Unavailable,
}

const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    end
    return 0
"#;

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        let mut guard = self.manager.write().await;
        *guard = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.manager.write().await;
        *guard = None;
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(true);
        };

        let script = redis::Script::new(
            r#"
            local current = redis.call("INCR", KEYS[1])
            if current == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return current
        "#,
        );

        let current: i64 =
            script.key(key).arg(window_seconds as i64).invoke_async(&mut manager).await?;

        Ok(current <= limit as i64)
    }

    /// `SET key token NX EX ttl`. The token is needed to release the lock.
    pub(crate) async fn try_lock(
        &self,
        key: &str,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<LockOutcome, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(LockOutcome::Unavailable);
        };

        let reply: Option<String> = cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut manager)
            .await?;

        Ok(if reply.is_some() { LockOutcome::Acquired } else { LockOutcome::Held })
    }

    pub(crate) async fn release_lock(&self, key: &str, token: &str) -> Result<(), RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(());
        };

        let _: i64 =
            redis::Script::new(RELEASE_SCRIPT).key(key).arg(token).invoke_async(&mut manager).await?;
        Ok(())
    }

    pub(crate) async fn get_string(&self, key: &str) -> Result<Option<String>, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(None);
        };

        manager.get(key).await
    }

    pub(crate) async fn set_string(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(());
        };

        manager.set_ex(key, value, ttl_seconds).await
    }

    pub(crate) async fn delete(&self, keys: &[String]) -> Result<(), RedisError> {
        if keys.is_empty() {
            return Ok(());
        }
        let Some(mut manager) = self.connection().await else {
            return Ok(());
        };

        let _: i64 = manager.del(keys).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LockOutcome, RedisHandle};
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[tokio::test]
    async fn rate_limit_enforces_limit() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        test_support::reset_redis(settings.redis().redis_url()).await.expect("redis reset");

        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = format!("rate-limit:{}", Uuid::new_v4());
        assert!(redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
        assert!(!redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = format!("lock:{}", Uuid::new_v4());
        assert_eq!(redis.try_lock(&key, "a", 30).await.expect("lock"), LockOutcome::Acquired);
        assert_eq!(redis.try_lock(&key, "b", 30).await.expect("lock"), LockOutcome::Held);

        redis.release_lock(&key, "b").await.expect("release foreign");
        assert_eq!(redis.try_lock(&key, "b", 30).await.expect("lock"), LockOutcome::Held);

        redis.release_lock(&key, "a").await.expect("release");
        assert_eq!(redis.try_lock(&key, "b", 30).await.expect("lock"), LockOutcome::Acquired);
    }

    #[tokio::test]
    async fn disconnected_handle_degrades_gracefully() {
        let redis = RedisHandle::new("redis://127.0.0.1:1/0".to_string());

        assert_eq!(redis.try_lock("k", "t", 5).await.expect("lock"), LockOutcome::Unavailable);
        assert_eq!(redis.get_string("k").await.expect("get"), None);
        assert!(redis.rate_limit("k", 1, 5).await.expect("rate limit"));
    }
}
