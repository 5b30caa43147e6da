use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

pub use market_data_adapter::{
    CoinGeckoConfig, CoinGeckoProvider, FallbackProvider, MarketDataError, MarketDataProvider,
    PriceMap, PriceSnapshot, StaticPriceProvider,
};

use crate::enrichment::MarketFields;
use crate::error::TrackerError;
use crate::trend::{DEFAULT_TREND_THRESHOLD, format_compact, format_percentage, format_price};

/// Tickers are stored and compared trimmed and uppercase.
#[must_use]
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// # Errors
/// `TrackerError::Validation` when the ticker is blank or has unexpected characters
pub fn check_symbol(symbol: &str) -> Result<(), TrackerError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(TrackerError::validation("symbol must not be blank"));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return Err(TrackerError::validation(format!(
            "symbol {symbol:?} contains unsupported characters"
        )));
    }
    Ok(())
}

/// Normalised symbols with duplicates and blanks removed, first-seen order kept.
#[must_use]
pub fn distinct_symbols<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for symbol in symbols.into_iter().map(normalize_symbol) {
        if !symbol.is_empty() && !distinct.contains(&symbol) {
            distinct.push(symbol);
        }
    }
    distinct
}

/// A quote for display: the market fields plus preformatted strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketQuote {
    pub symbol: String,
    /// `false` when the provider had no price for the symbol
    pub available: bool,
    #[serde(flatten)]
    pub market: MarketFields,
    pub price_display: String,
    pub change_24h_display: String,
    pub market_cap_display: String,
    pub volume_display: String,
}

impl MarketQuote {
    #[must_use]
    pub fn new(symbol: String, snapshot: Option<&PriceSnapshot>, threshold: Decimal) -> Self {
        let market = MarketFields::resolve(snapshot, threshold);
        Self {
            symbol,
            available: snapshot.is_some(),
            price_display: format_price(market.current_price),
            change_24h_display: format_percentage(market.change_24h),
            market_cap_display: format_compact(market.market_cap),
            volume_display: format_compact(market.volume_24h),
            market,
        }
    }
}

/// Batched price lookups on top of a provider. A provider error fails the
/// whole batch; symbols the provider leaves out are only logged.
#[derive(Clone)]
pub struct MarketDataService {
    provider: Arc<dyn MarketDataProvider>,
    trend_threshold: Decimal,
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("provider", &self.provider.name())
            .field("trend_threshold", &self.trend_threshold)
            .finish()
    }
}

impl MarketDataService {
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self::with_trend_threshold(provider, DEFAULT_TREND_THRESHOLD)
    }

    #[must_use]
    pub fn with_trend_threshold(provider: Arc<dyn MarketDataProvider>, threshold: Decimal) -> Self {
        Self {
            provider,
            trend_threshold: threshold.abs(),
        }
    }

    #[must_use]
    pub fn trend_threshold(&self) -> Decimal {
        self.trend_threshold
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One provider call for the distinct symbols. No call is made when
    /// nothing is left to price.
    /// # Errors
    /// `TrackerError::UpstreamUnavailable` when the provider call fails
    pub async fn get_current_prices(&self, symbols: &[String]) -> Result<PriceMap, TrackerError> {
        let symbols = distinct_symbols(symbols.iter().map(String::as_str));
        if symbols.is_empty() {
            return Ok(PriceMap::new());
        }

        let prices = self
            .provider
            .get_current_prices(&symbols)
            .await
            .map_err(|e| {
                error!(
                    "Market data request to {} failed: {}",
                    self.provider.name(),
                    e
                );
                TrackerError::UpstreamUnavailable(e)
            })?;

        let missing: Vec<&str> = symbols
            .iter()
            .filter(|s| !prices.contains_key(*s))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            debug!("Priced {} symbol(s)", symbols.len());
        } else {
            warn!("No market data for {}", missing.join(", "));
        }
        Ok(prices)
    }

    /// # Errors
    /// `TrackerError::UpstreamUnavailable` when the provider call fails
    pub async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<MarketQuote>, TrackerError> {
        let symbols = distinct_symbols(symbols.iter().map(String::as_str));
        let prices = self.get_current_prices(&symbols).await?;
        Ok(symbols
            .into_iter()
            .map(|symbol| {
                let snapshot = prices.get(&symbol);
                MarketQuote::new(symbol, snapshot, self.trend_threshold)
            })
            .collect())
    }
}
