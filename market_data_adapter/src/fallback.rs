use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::{MarketDataError, MarketDataProvider, PriceMap};

/// Asks `primary` first and `fallback` only when the primary request fails
/// as a whole. Partial answers from the primary are returned as they are.
pub struct FallbackProvider {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Arc<dyn MarketDataProvider>,
    name: String,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn MarketDataProvider>, fallback: Arc<dyn MarketDataProvider>) -> Self {
        let name = format!("{}+{}", primary.name(), fallback.name());
        Self {
            primary,
            fallback,
            name,
        }
    }
}

impl std::fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackProvider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MarketDataProvider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_current_prices(&self, symbols: &[String]) -> Result<PriceMap, MarketDataError> {
        let primary_error = match self.primary.get_current_prices(symbols).await {
            Ok(prices) => return Ok(prices),
            Err(e) => e,
        };
        warn!(
            "Primary market data provider {} failed ({}), trying {}",
            self.primary.name(),
            primary_error,
            self.fallback.name()
        );

        match self.fallback.get_current_prices(symbols).await {
            Ok(prices) => Ok(prices),
            Err(fallback_error) => {
                error!(
                    "Fallback market data provider {} failed too: {}",
                    self.fallback.name(),
                    fallback_error
                );
                Err(primary_error)
            }
        }
    }
}
