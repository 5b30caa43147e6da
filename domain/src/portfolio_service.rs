use chrono::Utc;
use database_adapter::db::DbError;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Result, TrackerError};
use crate::holding_service::HoldingService;
use crate::portfolio::{
    NewPortfolio, Portfolio, PortfolioId, PortfolioRepoExt, PortfolioSortColumn, PortfolioSummary,
    PortfolioUpdate,
};
use crate::sort::Sort;
use crate::store::Store;
use crate::user::UserId;

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TrackerError::validation("portfolio name must not be blank"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PortfolioService {
    store: Store,
    holdings: HoldingService,
}

impl PortfolioService {
    #[must_use]
    pub fn new(store: Store, holdings: HoldingService) -> Self {
        Self { store, holdings }
    }

    /// # Errors
    /// Storage failures only
    pub async fn list_portfolios(
        &self,
        user_id: &UserId,
        sort: Option<Sort<PortfolioSortColumn>>,
    ) -> Result<Vec<Portfolio>> {
        Ok(self.store.portfolios.find_all_for_user(user_id, sort).await?)
    }

    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio
    pub async fn get_portfolio(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
    ) -> Result<Portfolio> {
        self.store.owned_portfolio(user_id, portfolio_id).await
    }

    /// The user's first portfolio is always the default one.
    /// # Errors
    /// `Validation` for a blank or oversized name
    pub async fn create_portfolio(&self, user_id: &UserId, input: NewPortfolio) -> Result<Portfolio> {
        input.validate()?;
        check_name(&input.name)?;

        let is_first = self
            .store
            .portfolios
            .find_all_for_user(user_id, None)
            .await?
            .is_empty();
        let is_default = is_first || input.is_default;
        if is_default && !is_first {
            self.clear_default(user_id).await?;
        }

        let now = Utc::now();
        let portfolio = Portfolio {
            id: Uuid::new_v4(),
            user_id: *user_id,
            name: input.name.trim().to_string(),
            description: input.description.filter(|d| !d.is_empty()),
            is_default,
            created_at: now,
            updated_at: now,
        };
        let portfolio = self.store.portfolios.create_portfolio(portfolio).await?;
        info!("Created portfolio {} for user {}", portfolio.id, user_id);
        Ok(portfolio)
    }

    /// # Errors
    /// `Validation` for bad input, `NotFound`/`Unauthorized` for the portfolio
    pub async fn update_portfolio(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
        update: PortfolioUpdate,
    ) -> Result<Portfolio> {
        update.validate()?;
        if let Some(name) = &update.name {
            check_name(name)?;
        }
        let mut portfolio = self.store.owned_portfolio(user_id, portfolio_id).await?;
        if update.is_default == Some(true) && !portfolio.is_default {
            self.clear_default(user_id).await?;
        }

        update.apply(&mut portfolio);
        self.store
            .portfolios
            .update(*portfolio_id, portfolio.clone())
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Portfolio", portfolio_id),
                other => other.into(),
            })?;
        Ok(portfolio)
    }

    /// Deletes the portfolio with its holdings and their transactions.
    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio
    pub async fn delete_portfolio(&self, user_id: &UserId, portfolio_id: &PortfolioId) -> Result<()> {
        self.store.owned_portfolio(user_id, portfolio_id).await?;
        self.store
            .delete_portfolio(portfolio_id)
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Portfolio", portfolio_id),
                other => other.into(),
            })?;
        info!("Deleted portfolio {} of user {}", portfolio_id, user_id);
        Ok(())
    }

    /// # Errors
    /// `NotFound`/`Unauthorized` for the portfolio, `UpstreamUnavailable` when pricing fails
    pub async fn get_portfolio_summary(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
    ) -> Result<PortfolioSummary> {
        let portfolio = self.store.owned_portfolio(user_id, portfolio_id).await?;
        let holdings = self
            .holdings
            .enriched_for_portfolio(portfolio_id, None)
            .await?;
        PortfolioSummary::from_holdings(portfolio, &holdings)
    }

    async fn clear_default(&self, user_id: &UserId) -> Result<()> {
        while let Some(mut current) = self.store.portfolios.find_default(user_id).await? {
            current.is_default = false;
            current.updated_at = Utc::now();
            self.store.portfolios.update(current.id, current).await?;
        }
        Ok(())
    }
}
