pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod flight_repo;
pub mod pilot_repo;
pub mod policy_repo;
pub mod briefing_repo;
pub mod navdata_repo;

use std::sync::Arc;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use flight_repo::PostgresFlightRepository;
pub use pilot_repo::PostgresPilotDirectory;
pub use policy_repo::PostgresPolicyStore;
pub use briefing_repo::PostgresBriefingLookup;
pub use navdata_repo::NavdataRouteExpander;

use app_config::Config;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Every adapter the API needs, wired to one pool.
pub struct Stores {
    pub db: DbClient,
    pub redis: Option<RedisClient>,
    pub flights: Arc<PostgresFlightRepository>,
    pub pilots: Arc<PostgresPilotDirectory>,
    pub policies: Arc<PostgresPolicyStore>,
    pub briefings: Arc<PostgresBriefingLookup>,
    pub routes: Arc<NavdataRouteExpander>,
}

pub async fn connect(config: &Config) -> Result<Stores, StoreError> {
    let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
    db.migrate().await?;

    let mut policies = PostgresPolicyStore::new(db.pool.clone(), config.pilots.into());
    let redis = match &config.redis {
        Some(redis_config) => {
            let client = RedisClient::new(&redis_config.url).await?;
            policies = policies.with_cache(client.clone(), redis_config.setting_ttl_seconds);
            Some(client)
        }
        None => {
            tracing::warn!("No redis configured; rate limiting and setting cache disabled");
            None
        }
    };

    Ok(Stores {
        flights: Arc::new(PostgresFlightRepository::new(db.pool.clone())),
        pilots: Arc::new(PostgresPilotDirectory::new(db.pool.clone())),
        policies: Arc::new(policies),
        briefings: Arc::new(PostgresBriefingLookup::new(db.pool.clone())),
        routes: Arc::new(NavdataRouteExpander::new(db.pool.clone())),
        redis,
        db,
    })
}
