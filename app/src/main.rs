mod api;
mod config;
mod logging;
mod services;

use std::sync::Arc;

use color_eyre::Result;
use domain::core::CoinTracker;
use domain::market_data::{MarketDataProvider, MarketDataService};
use domain::market_data_factory::{MarketDataProviderFactory, demo_snapshots};
use domain::store::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::auth::JwtKeys;
use crate::config::{AppConfig, ProviderKind};
use crate::services::TrackerHandle;

fn build_provider(config: &AppConfig) -> Result<Arc<dyn MarketDataProvider>> {
    let primary = match config.provider {
        ProviderKind::CoinGecko => {
            MarketDataProviderFactory::create_coingecko_provider(config.coingecko.clone())?
        }
        ProviderKind::Static => MarketDataProviderFactory::create_static_provider(demo_snapshots()),
    };
    if config.static_fallback && config.provider != ProviderKind::Static {
        let fallback = MarketDataProviderFactory::create_static_provider(demo_snapshots());
        return Ok(MarketDataProviderFactory::with_fallback(primary, fallback));
    }
    Ok(primary)
}

async fn build_store(config: &AppConfig) -> Result<Store> {
    match &config.database_url {
        Some(url) => {
            let pool = database_adapter::db::connect(url).await?;
            tracing::info!("Using Postgres storage");
            Ok(Store::postgres(pool).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory only");
            Ok(Store::in_memory())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Initialize logging
    logging::init()?;
    tracing::info!("Starting CoinTracker application");

    let config = AppConfig::from_env()?;
    let provider = build_provider(&config)?;
    let market_data = MarketDataService::with_trend_threshold(provider, config.trend_threshold);
    tracing::info!(
        "Market data from {} (trend threshold {}%)",
        market_data.provider_name(),
        market_data.trend_threshold()
    );

    let store = build_store(&config).await?;
    let tracker = CoinTracker::with_market_data(store, market_data);
    if let Some(user) = config.demo_user {
        tracker.debug_populate(&user).await?;
        tracing::info!("Demo data created for user {user}");
    }
    tracing::debug!("CoinTracker initialized: {tracker:#?}");

    let state = TrackerHandle::new(tracker, JwtKeys::from_secret(config.jwt_secret.as_bytes()));
    let app = api::create_api(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
