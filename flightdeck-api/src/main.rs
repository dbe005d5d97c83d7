use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use flightdeck_api::{app, state::{AppState, AuthConfig}};
use flightdeck_core::{CriteriaBuilder, FlightSearchService};
use flightdeck_store::app_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flightdeck_api=debug,flightdeck_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Flightdeck API on port {}", config.server.port);

    let stores = flightdeck_store::connect(&config)
        .await
        .context("Failed to connect to stores")?;

    let flights = FlightSearchService::new(
        stores.flights,
        stores.policies,
        stores.briefings,
        stores.routes,
        CriteriaBuilder::new(config.search.page_size, config.search.max_page_size),
    );

    let app_state = AppState {
        flights,
        pilots: stores.pilots,
        redis: stores.redis.map(Arc::new),
        rate_limit: config.rate_limit.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
