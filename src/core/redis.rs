use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
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

    /// `SET key token NX EX ttl`. Without a connection every lease is granted.
    pub(crate) async fn try_acquire_lease(
        &self,
        key: &str,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            tracing::debug!(key, "Redis disconnected; lease granted without coordination");
            return Ok(true);
        };

        let reply: Option<String> = cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut manager)
            .await?;

        Ok(reply.is_some())
    }

    /// Pushes the expiry of a lease `token` still owns, re-taking it if it lapsed
    /// unclaimed. `false` means another token holds it now.
    pub(crate) async fn renew_lease(
        &self,
        key: &str,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return Ok(true);
        };

        let script = redis::Script::new(
            r#"
            local current = redis.call("GET", KEYS[1])
            if current == ARGV[1] then
                return redis.call("EXPIRE", KEYS[1], ARGV[2])
            end
            if not current then
                redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
                return 1
            end
            return 0
        "#,
        );

        let renewed: i64 =
            script.key(key).arg(token).arg(ttl_seconds).invoke_async(&mut manager).await?;
        Ok(renewed == 1)
    }

    /// Deletes the lease only if `token` still owns it.
    pub(crate) async fn release_lease(&self, key: &str, token: &str) -> Result<(), RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return Ok(());
        };

        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            end
            return 0
        "#,
        );

        let _: i64 = script.key(key).arg(token).invoke_async(&mut manager).await?;
        Ok(())
    }
}
