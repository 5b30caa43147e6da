use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{MarketDataError, MarketDataProvider, PriceMap, PriceSnapshot};

/// Public API (no key required, limited)
pub const PUBLIC_BASE_URL: &str = "https://api.coingecko.com/api/v3";
/// Pro API (paid)
pub const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Overrides the URL derived from `api_key`
    pub base_url: Option<String>,
    /// Demo keys start with `CG-`; anything else is treated as a Pro key
    pub api_key: Option<String>,
    pub vs_currency: String,
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            vs_currency: "usd".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CoinGeckoConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/');
        }
        match self.api_key.as_deref() {
            Some(key) if !key.starts_with("CG-") => PRO_BASE_URL,
            _ => PUBLIC_BASE_URL,
        }
    }

    fn api_key_header(&self) -> Option<(&'static str, &str)> {
        self.api_key.as_deref().map(|key| {
            if key.starts_with("CG-") {
                ("x-cg-demo-api-key", key)
            } else {
                ("x-cg-pro-api-key", key)
            }
        })
    }
}

/// One row of `/coins/markets`. Numbers are read from their JSON text, so
/// a price like `0.1` arrives as exactly 0.1.
#[derive(Debug, Deserialize)]
pub(crate) struct CoinMarket {
    pub symbol: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub market_cap: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_volume: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_change_percentage_1h_in_currency: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_change_percentage_24h_in_currency: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_change_percentage_7d_in_currency: Option<Decimal>,
}

fn to_decimal(value: Option<Decimal>) -> Decimal {
    value.map(|d| d.normalize()).unwrap_or_default()
}

/// Coins without a current price are dropped. CoinGecko orders rows by
/// market cap, so when several coins share a ticker the first one wins.
pub(crate) fn collect_markets(markets: Vec<CoinMarket>) -> PriceMap {
    let mut prices = PriceMap::new();
    for market in markets {
        let Some(price) = market.current_price else {
            debug!("Skipping {} without a current price", market.symbol);
            continue;
        };
        let symbol = market.symbol.to_uppercase();
        prices.entry(symbol.clone()).or_insert_with(|| PriceSnapshot {
            symbol,
            price: price.normalize(),
            change_1h: to_decimal(market.price_change_percentage_1h_in_currency),
            change_24h: to_decimal(market.price_change_percentage_24h_in_currency),
            change_7d: to_decimal(market.price_change_percentage_7d_in_currency),
            volume_24h: to_decimal(market.total_volume),
            market_cap: to_decimal(market.market_cap),
        });
    }
    prices
}

#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    client: Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoProvider {
    /// # Errors
    /// Returns `MarketDataError::Request` if the HTTP client cannot be built
    pub fn new(config: CoinGeckoConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn get_current_prices(&self, symbols: &[String]) -> Result<PriceMap, MarketDataError> {
        if symbols.is_empty() {
            return Ok(PriceMap::new());
        }
        let url = format!("{}/coins/markets", self.config.base_url());
        let joined = symbols
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("vs_currency", self.config.vs_currency.as_str()),
                ("symbols", joined.as_str()),
                ("price_change_percentage", "1h,24h,7d"),
                ("per_page", "250"),
            ]);
        if let Some((header, key)) = self.config.api_key_header() {
            request = request.header(header, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("CoinGecko returned {} for {} symbol(s)", status, symbols.len());
            return Err(MarketDataError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let markets: Vec<CoinMarket> = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;
        let prices = collect_markets(markets);
        debug!(
            "CoinGecko priced {}/{} requested symbols",
            prices.len(),
            symbols.len()
        );
        Ok(prices)
    }
}
