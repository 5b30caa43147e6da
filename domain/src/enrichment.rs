//! Joins stored rows with a price batch. Rows keep their load order, and a
//! symbol missing from the batch yields zeroed market fields instead of an
//! error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::amount;
use crate::error::Result;
use crate::holding::Holding;
use crate::market_data::{PriceMap, PriceSnapshot};
use crate::trend::{Trend, classify_trend};
use crate::watchlist::WatchlistItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketFields {
    pub current_price: Decimal,
    pub change_1h: Decimal,
    pub change_24h: Decimal,
    pub change_7d: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
    pub trend: Trend,
}

impl MarketFields {
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            current_price: Decimal::ZERO,
            change_1h: Decimal::ZERO,
            change_24h: Decimal::ZERO,
            change_7d: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            trend: Trend::Neutral,
        }
    }

    /// Trend follows the 24h change.
    #[must_use]
    pub fn resolve(snapshot: Option<&PriceSnapshot>, threshold: Decimal) -> Self {
        match snapshot {
            Some(s) => Self {
                current_price: s.price,
                change_1h: s.change_1h,
                change_24h: s.change_24h,
                change_7d: s.change_7d,
                volume_24h: s.volume_24h,
                market_cap: s.market_cap,
                trend: classify_trend(s.change_24h, threshold),
            },
            None => Self::unavailable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichedWatchlistItem {
    #[serde(flatten)]
    pub item: WatchlistItem,
    #[serde(flatten)]
    pub market: MarketFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    #[serde(flatten)]
    pub market: MarketFields,
    /// quantity × current price
    pub current_value: Decimal,
    /// quantity × average cost
    pub cost_basis: Decimal,
    pub gain_loss: Decimal,
    /// 0 when the cost basis is 0
    pub gain_loss_percentage: Decimal,
    /// Share of the batch's total current value, 0 when that total is 0
    pub allocation_percentage: Decimal,
}

#[must_use]
pub fn enrich_watchlist(
    items: Vec<WatchlistItem>,
    prices: &PriceMap,
    threshold: Decimal,
) -> Vec<EnrichedWatchlistItem> {
    items
        .into_iter()
        .map(|item| {
            let market = MarketFields::resolve(prices.get(&item.symbol), threshold);
            EnrichedWatchlistItem { item, market }
        })
        .collect()
}

/// Allocation needs the batch total, so values are computed for every row
/// before any allocation is assigned.
/// # Errors
/// `TrackerError::Validation` when a derived figure leaves the decimal range
pub fn enrich_holdings(
    holdings: Vec<Holding>,
    prices: &PriceMap,
    threshold: Decimal,
) -> Result<Vec<EnrichedHolding>> {
    let mut enriched = holdings
        .into_iter()
        .map(|holding| {
            let market = MarketFields::resolve(prices.get(&holding.symbol), threshold);
            let current_value =
                amount::mul(holding.quantity, market.current_price, "current value")?;
            let cost_basis = holding.cost_basis()?;
            let gain_loss = amount::sub(current_value, cost_basis, "gain/loss")?;
            let gain_loss_percentage =
                amount::percentage_of(gain_loss, cost_basis, "gain/loss percentage")?;
            Ok(EnrichedHolding {
                holding,
                market,
                current_value,
                cost_basis,
                gain_loss,
                gain_loss_percentage,
                allocation_percentage: Decimal::ZERO,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let total_value = total_current_value(&enriched)?;
    for holding in &mut enriched {
        holding.allocation_percentage =
            amount::percentage_of(holding.current_value, total_value, "allocation")?;
    }
    Ok(enriched)
}

/// # Errors
/// `TrackerError::Validation` when the sum leaves the decimal range
pub fn total_current_value(holdings: &[EnrichedHolding]) -> Result<Decimal> {
    amount::sum(holdings.iter().map(|h| h.current_value), "total value")
}
