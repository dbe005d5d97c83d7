use redis::{AsyncCommands, RedisResult};
use tracing::debug;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_setting(&self, key: &str) -> RedisResult<Option<bool>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(setting_key(key)).await
    }

    pub async fn set_setting(&self, key: &str, enabled: bool, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(setting_key(key), enabled, ttl_seconds).await?;
        debug!("Cached setting {} = {}", key, enabled);
        Ok(())
    }

    /// Fixed window counter; true while the caller is under `limit`. The
    /// window starts with the first hit and is not extended by later ones.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count, ttl): (i64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .ttl(key)
            .query_async(&mut conn)
            .await?;

        if window_unset(ttl) {
            conn.expire::<_, ()>(key, window_seconds).await?;
        }

        Ok(count <= limit)
    }
}

/// `TTL` answers -1 for a key without expiry and -2 for a missing key.
fn window_unset(ttl: i64) -> bool {
    ttl < 0
}

fn setting_key(key: &str) -> String {
    format!("setting:{}", key)
}
