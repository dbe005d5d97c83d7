use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use flightdeck_core::repository::{BoxError, PolicyStore};
use flightdeck_core::search::PolicyKey;
use flightdeck_core::SearchPolicy;

use crate::RedisClient;

/// Reads the search toggles from the `settings` table, falling back to the
/// configured defaults for keys that have no row. Values are cached in Redis
/// when a client is configured.
pub struct PostgresPolicyStore {
    pool: PgPool,
    defaults: SearchPolicy,
    cache: Option<(RedisClient, u64)>,
}

impl PostgresPolicyStore {
    pub fn new(pool: PgPool, defaults: SearchPolicy) -> Self {
        Self { pool, defaults, cache: None }
    }

    pub fn with_cache(mut self, redis: RedisClient, ttl_seconds: u64) -> Self {
        self.cache = Some((redis, ttl_seconds));
        self
    }

    fn default_for(&self, key: PolicyKey) -> bool {
        match key {
            PolicyKey::RestrictToCompany => self.defaults.restrict_to_company,
            PolicyKey::OnlyFlightsFromCurrent => self.defaults.only_flights_from_current,
        }
    }

    async fn fetch(&self, key: PolicyKey) -> Result<bool, sqlx::Error> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT value FROM settings WHERE key = $1")
            .bind(key.setting_key())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .and_then(|(value,)| setting_flag(&value))
            .unwrap_or_else(|| self.default_for(key)))
    }
}

#[async_trait]
impl PolicyStore for PostgresPolicyStore {
    async fn get(&self, key: PolicyKey) -> Result<bool, BoxError> {
        let name = key.setting_key();

        if let Some((redis, _)) = &self.cache {
            match redis.get_setting(name).await {
                Ok(Some(cached)) => return Ok(cached),
                Ok(None) => {}
                Err(e) => warn!("Setting cache read failed for {}: {}", name, e),
            }
        }

        let enabled = self.fetch(key).await?;

        if let Some((redis, ttl)) = &self.cache {
            if let Err(e) = redis.set_setting(name, enabled, *ttl).await {
                warn!("Setting cache write failed for {}: {}", name, e);
            }
        }

        Ok(enabled)
    }
}

/// Expected format: `{"value": <bool | number | string>}`.
fn setting_flag(raw: &Value) -> Option<bool> {
    match raw.get("value")? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
