use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// Fixed-window counter: increments `key` and reports whether the count
    /// is still within `limit` for the current window.
    pub async fn rate_limit_check(
        &self,
        key: &str,
        limit: u64,
        window_secs: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key, 1u64).await?;
        if count == 1 {
            conn.expire::<_, ()>(key, window_secs as i64).await?;
        }
        Ok(count <= limit)
    }

    /// Takes back one count from a `rate_limit_check` window. A window that
    /// already expired is left alone.
    pub async fn release(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::Script::new(
            "if redis.call('EXISTS', KEYS[1]) == 1 then return redis.call('DECR', KEYS[1]) end return 0",
        )
        .key(key)
        .invoke_async::<_, i64>(&mut conn)
        .await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
