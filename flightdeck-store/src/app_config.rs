use serde::Deserialize;
use std::env;

use flightdeck_core::search::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use flightdeck_core::SearchPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub pilots: PilotRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> u32 { DEFAULT_PAGE_SIZE }
fn default_max_page_size() -> u32 { DEFAULT_MAX_PAGE_SIZE }

/// Fallback values for the tenant toggles; rows in the `settings` table win.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PilotRules {
    #[serde(default)]
    pub restrict_to_company: bool,
    #[serde(default)]
    pub only_flights_from_current: bool,
}

impl From<PilotRules> for SearchPolicy {
    fn from(rules: PilotRules) -> Self {
        SearchPolicy {
            restrict_to_company: rules.restrict_to_company,
            only_flights_from_current: rules.only_flights_from_current,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests: 100, window_seconds: 60 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_setting_ttl")]
    pub setting_ttl_seconds: u64,
}

fn default_setting_ttl() -> u64 { 60 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `FLIGHTDECK__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("FLIGHTDECK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/flightdeck"

            [auth]
            jwt_secret = "secret"
            jwt_expiration_seconds = 3600
        "#;
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("Failed to deserialize");

        assert!(cfg.redis.is_none());
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.search.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.rate_limit.requests, 100);
        assert_eq!(SearchPolicy::from(cfg.pilots), SearchPolicy::default());
    }

    #[test]
    fn test_pilot_rules_section() {
        let raw = r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/flightdeck"
            [auth]
            jwt_secret = "secret"
            jwt_expiration_seconds = 3600
            [pilots]
            restrict_to_company = true
            [search]
            page_size = 20
        "#;
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("Failed to deserialize");

        let policy = SearchPolicy::from(cfg.pilots);
        assert!(policy.restrict_to_company);
        assert!(!policy.only_flights_from_current);
        assert_eq!(cfg.search.page_size, 20);
        assert_eq!(cfg.search.max_page_size, DEFAULT_MAX_PAGE_SIZE);
    }
}
