use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::{MarketDataError, MarketDataProvider, PriceMap, PriceSnapshot};

/// Serves prices from a fixed table. Used for offline runs and tests.
#[derive(Debug, Default)]
pub struct StaticPriceProvider {
    prices: RwLock<PriceMap>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl StaticPriceProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prices(snapshots: impl IntoIterator<Item = PriceSnapshot>) -> Self {
        let provider = Self::new();
        for snapshot in snapshots {
            provider.set_price(snapshot);
        }
        provider
    }

    pub fn set_price(&self, snapshot: PriceSnapshot) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(snapshot.symbol.to_uppercase(), snapshot);
    }

    pub fn remove_price(&self, symbol: &str) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.remove(&symbol.to_uppercase());
    }

    /// While set, every request fails as a whole.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of batched requests served so far, failed ones included.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StaticPriceProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_current_prices(&self, symbols: &[String]) -> Result<PriceMap, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketDataError::Unavailable(
                "static price table is switched off".to_string(),
            ));
        }

        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                let key = symbol.to_uppercase();
                prices.get(&key).map(|snapshot| (key, snapshot.clone()))
            })
            .collect())
    }
}
