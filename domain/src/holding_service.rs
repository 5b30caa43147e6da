use std::collections::HashMap;

use database_adapter::db::DbError;
use rust_decimal::Decimal;
use tracing::info;

use crate::enrichment::{EnrichedHolding, enrich_holdings};
use crate::error::{Result, TrackerError};
use crate::holding::{
    Holding, HoldingId, HoldingRepoExt, HoldingSortColumn, HoldingUpdate, NewHolding,
};
use crate::market_data::MarketDataService;
use crate::portfolio::PortfolioId;
use crate::sort::Sort;
use crate::store::Store;
use crate::user::UserId;

pub(crate) fn holding_exists(symbol: &str) -> impl FnOnce(DbError) -> TrackerError + '_ {
    move |e| match e {
        DbError::UniqueViolation(_) => TrackerError::AlreadyExists {
            entity: "Holding",
            key: symbol.to_string(),
        },
        other => other.into(),
    }
}

#[derive(Debug, Clone)]
pub struct HoldingService {
    store: Store,
    market_data: MarketDataService,
}

impl HoldingService {
    #[must_use]
    pub fn new(store: Store, market_data: MarketDataService) -> Self {
        Self { store, market_data }
    }

    /// Loads the portfolio's holdings and prices them in one batch. An empty
    /// portfolio makes no market data call.
    pub(crate) async fn enriched_for_portfolio(
        &self,
        portfolio_id: &PortfolioId,
        sort: Option<Sort<HoldingSortColumn>>,
    ) -> Result<Vec<EnrichedHolding>> {
        let holdings = self
            .store
            .holdings
            .find_all_for_portfolio(portfolio_id, sort)
            .await?;
        if holdings.is_empty() {
            return Ok(Vec::new());
        }

        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let prices = self.market_data.get_current_prices(&symbols).await?;
        enrich_holdings(holdings, &prices, self.market_data.trend_threshold())
    }

    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio, `UpstreamUnavailable` when pricing fails
    pub async fn list_holdings(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
        sort: Option<Sort<HoldingSortColumn>>,
    ) -> Result<Vec<EnrichedHolding>> {
        self.store.owned_portfolio(user_id, portfolio_id).await?;
        self.enriched_for_portfolio(portfolio_id, sort).await
    }

    /// The holding enriched alongside the rest of its portfolio, so its
    /// allocation is relative to the whole batch.
    /// # Errors
    /// `NotFound`/`Unauthorized` for the holding, `UpstreamUnavailable` when pricing fails
    pub async fn get_holding(
        &self,
        user_id: &UserId,
        holding_id: &HoldingId,
    ) -> Result<EnrichedHolding> {
        let (portfolio, _) = self.store.owned_holding(user_id, holding_id).await?;
        self.enriched_for_portfolio(&portfolio.id, None)
            .await?
            .into_iter()
            .find(|h| h.holding.id == *holding_id)
            .ok_or_else(|| TrackerError::not_found("Holding", holding_id))
    }

    /// # Errors
    /// `Validation` for bad input, `AlreadyExists` when the portfolio holds the symbol
    pub async fn add_holding(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
        input: NewHolding,
    ) -> Result<Holding> {
        input.check()?;
        self.store.owned_portfolio(user_id, portfolio_id).await?;

        let holding = input.into_holding(*portfolio_id);
        let holding = self
            .store
            .holdings
            .create_holding(holding.clone())
            .await
            .map_err(holding_exists(&holding.symbol))?;
        info!(
            "Added {} {} to portfolio {}",
            holding.quantity, holding.symbol, portfolio_id
        );
        Ok(holding)
    }

    /// # Errors
    /// `Validation` for bad input, `NotFound`/`Unauthorized` for the holding
    pub async fn update_holding(
        &self,
        user_id: &UserId,
        holding_id: &HoldingId,
        update: HoldingUpdate,
    ) -> Result<Holding> {
        update.check()?;
        let _guard = self.store.lock_holding(holding_id).await;
        self.store.owned_holding(user_id, holding_id).await?;
        let holding = self
            .store
            .holdings
            .update_holding(holding_id, &update)
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Holding", holding_id),
                other => other.into(),
            })?;
        Ok(holding)
    }

    /// Deletes the holding and its transactions.
    /// # Errors
    /// `NotFound`/`Unauthorized` for the holding
    pub async fn delete_holding(&self, user_id: &UserId, holding_id: &HoldingId) -> Result<()> {
        let (_, holding) = self.store.owned_holding(user_id, holding_id).await?;
        self.store
            .delete_holding(holding_id)
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Holding", holding_id),
                other => other.into(),
            })?;
        info!("Removed {} from portfolio {}", holding.symbol, holding.portfolio_id);
        Ok(())
    }

    /// Current value of the portfolio at live prices.
    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio, `UpstreamUnavailable` when pricing fails
    pub async fn get_total_value(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
    ) -> Result<Decimal> {
        self.store.owned_portfolio(user_id, portfolio_id).await?;
        let symbols = self.store.holdings.get_symbols(portfolio_id).await?;
        let prices: HashMap<String, Decimal> = self
            .market_data
            .get_current_prices(&symbols)
            .await?
            .into_iter()
            .map(|(symbol, snapshot)| (symbol, snapshot.price))
            .collect();
        self.store
            .holdings
            .get_total_value(portfolio_id, &prices)
            .await
    }

    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio
    pub async fn get_symbols(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
    ) -> Result<Vec<String>> {
        self.store.owned_portfolio(user_id, portfolio_id).await?;
        Ok(self.store.holdings.get_symbols(portfolio_id).await?)
    }
}
