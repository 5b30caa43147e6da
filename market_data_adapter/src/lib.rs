use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod coingecko;
mod fallback;
mod static_provider;

pub use coingecko::{CoinGeckoConfig, CoinGeckoProvider};
pub use fallback::FallbackProvider;
pub use static_provider::StaticPriceProvider;

// Market data error types
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Market data request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Market data provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Failed to decode market data: {0}")]
    Decode(String),
    #[error("Market data provider is unavailable: {0}")]
    Unavailable(String),
}

/// Live market figures for one symbol. Changes are percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub price: Decimal,
    pub change_1h: Decimal,
    pub change_24h: Decimal,
    pub change_7d: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
}

impl PriceSnapshot {
    #[must_use]
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            price,
            change_1h: Decimal::ZERO,
            change_24h: Decimal::ZERO,
            change_7d: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn with_changes(mut self, change_1h: Decimal, change_24h: Decimal, change_7d: Decimal) -> Self {
        self.change_1h = change_1h;
        self.change_24h = change_24h;
        self.change_7d = change_7d;
        self
    }

    #[must_use]
    pub fn with_volume(mut self, volume_24h: Decimal) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    #[must_use]
    pub fn with_market_cap(mut self, market_cap: Decimal) -> Self {
        self.market_cap = market_cap;
        self
    }
}

/// Snapshots keyed by uppercase symbol.
pub type PriceMap = HashMap<String, PriceSnapshot>;

// Market data provider trait
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch current prices for `symbols` in one batched request.
    ///
    /// Symbols the provider cannot price are left out of the map; that is not
    /// an error. An `Err` means the whole request failed.
    async fn get_current_prices(&self, symbols: &[String]) -> Result<PriceMap, MarketDataError>;
}
