use std::sync::Arc;

use flightdeck_core::repository::PilotDirectory;
use flightdeck_core::FlightSearchService;
use flightdeck_store::app_config::RateLimitConfig;
use flightdeck_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub flights: FlightSearchService,
    pub pilots: Arc<dyn PilotDirectory>,
    /// Rate limiting is skipped when unset.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}
