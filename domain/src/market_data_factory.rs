use std::sync::Arc;

use rust_decimal_macros::dec;

use crate::market_data::{
    CoinGeckoConfig, CoinGeckoProvider, FallbackProvider, MarketDataError, MarketDataProvider,
    PriceSnapshot, StaticPriceProvider,
};

/// Factory for the market data providers the tracker can run against
pub struct MarketDataProviderFactory;

impl MarketDataProviderFactory {
    /// # Errors
    /// `MarketDataError::Request` if the HTTP client cannot be built
    pub fn create_coingecko_provider(
        config: CoinGeckoConfig,
    ) -> Result<Arc<dyn MarketDataProvider>, MarketDataError> {
        Ok(Arc::new(CoinGeckoProvider::new(config)?))
    }

    /// Offline provider with a fixed table of prices
    #[must_use]
    pub fn create_static_provider(
        snapshots: impl IntoIterator<Item = PriceSnapshot>,
    ) -> Arc<dyn MarketDataProvider> {
        Arc::new(StaticPriceProvider::with_prices(snapshots))
    }

    #[must_use]
    pub fn with_fallback(
        primary: Arc<dyn MarketDataProvider>,
        fallback: Arc<dyn MarketDataProvider>,
    ) -> Arc<dyn MarketDataProvider> {
        Arc::new(FallbackProvider::new(primary, fallback))
    }
}

/// Reference table served by the offline provider
#[must_use]
pub fn demo_snapshots() -> Vec<PriceSnapshot> {
    vec![
        PriceSnapshot::new("BTC", dec!(67250.42))
            .with_changes(dec!(0.12), dec!(2.35), dec!(-1.8))
            .with_volume(dec!(28500000000))
            .with_market_cap(dec!(1325000000000)),
        PriceSnapshot::new("ETH", dec!(3480.15))
            .with_changes(dec!(-0.05), dec!(-0.31), dec!(4.2))
            .with_volume(dec!(14200000000))
            .with_market_cap(dec!(418000000000)),
        PriceSnapshot::new("SOL", dec!(142.87))
            .with_changes(dec!(0.4), dec!(-3.12), dec!(6.75))
            .with_volume(dec!(2900000000))
            .with_market_cap(dec!(66000000000)),
        PriceSnapshot::new("ADA", dec!(0.4521))
            .with_changes(dec!(0.02), dec!(0.48), dec!(-2.1))
            .with_volume(dec!(410000000))
            .with_market_cap(dec!(16000000000)),
        PriceSnapshot::new("DOGE", dec!(0.1287))
            .with_changes(dec!(1.1), dec!(5.6), dec!(12.4))
            .with_volume(dec!(1800000000))
            .with_market_cap(dec!(18600000000)),
    ]
}
