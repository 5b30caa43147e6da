use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_adapter::db::{DbError, Repository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::amount;
use crate::enrichment::{EnrichedHolding, total_current_value};
use crate::error::TrackerError;
use crate::sort::{Sort, sort_columns};
use crate::user::UserId;

pub type PortfolioId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Portfolio {
    #[schema(value_type = String, format = Uuid)]
    pub id: PortfolioId,
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewPortfolio {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct PortfolioUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub is_default: Option<bool>,
}

impl PortfolioUpdate {
    /// Applies the supplied fields only.
    pub fn apply(&self, portfolio: &mut Portfolio) {
        if let Some(name) = &self.name {
            portfolio.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            portfolio.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(is_default) = self.is_default {
            portfolio.is_default = is_default;
        }
        portfolio.updated_at = Utc::now();
    }
}

sort_columns! {
    PortfolioSortColumn {
        Name => ("name", Text),
        CreatedAt => ("created_at", Timestamp),
    }
}

pub type PortfolioRepo = dyn Repository<Portfolio, PortfolioId>;

#[async_trait]
pub trait PortfolioRepoExt {
    async fn find_all_for_user(
        &self,
        user_id: &UserId,
        sort: Option<Sort<PortfolioSortColumn>>,
    ) -> Result<Vec<Portfolio>, DbError>;
    async fn find_default(&self, user_id: &UserId) -> Result<Option<Portfolio>, DbError>;
    async fn create_portfolio(&self, portfolio: Portfolio) -> Result<Portfolio, DbError>;
}

#[async_trait]
impl<R> PortfolioRepoExt for R
where
    R: Repository<Portfolio, PortfolioId> + ?Sized,
{
    async fn find_all_for_user(
        &self,
        user_id: &UserId,
        sort: Option<Sort<PortfolioSortColumn>>,
    ) -> Result<Vec<Portfolio>, DbError> {
        let order = sort.map(|s| s.order());
        let rows = self
            .find_all_by_field("user_id", &user_id.to_string(), order.as_ref())
            .await?;
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    async fn find_default(&self, user_id: &UserId) -> Result<Option<Portfolio>, DbError> {
        let user_id = user_id.to_string();
        let row = self
            .find_by_fields(&[("user_id", user_id.as_str()), ("is_default", "true")])
            .await?;
        Ok(row.map(|(_, p)| p))
    }

    async fn create_portfolio(&self, portfolio: Portfolio) -> Result<Portfolio, DbError> {
        self.insert(portfolio.id, portfolio.clone()).await?;
        Ok(portfolio)
    }
}

/// Totals over one enriched holdings batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioSummary {
    pub portfolio: Portfolio,
    pub holdings_count: usize,
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_gain_loss: Decimal,
    pub total_gain_loss_percentage: Decimal,
    /// Value gained or lost over the last 24h, weighted by each holding's current value
    pub change_24h_value: Decimal,
}

impl PortfolioSummary {
    /// # Errors
    /// `TrackerError::Validation` when a total leaves the decimal range
    pub fn from_holdings(
        portfolio: Portfolio,
        holdings: &[EnrichedHolding],
    ) -> Result<Self, TrackerError> {
        let total_value = total_current_value(holdings)?;
        let total_cost = amount::sum(holdings.iter().map(|h| h.cost_basis), "total cost")?;
        let total_gain_loss = amount::sub(total_value, total_cost, "total gain/loss")?;
        let total_gain_loss_percentage =
            amount::percentage_of(total_gain_loss, total_cost, "total gain/loss percentage")?;

        let mut change_24h_value = Decimal::ZERO;
        for h in holdings {
            let divisor = Decimal::ONE_HUNDRED + h.market.change_24h;
            if divisor.is_zero() {
                continue;
            }
            let weighted = amount::mul(h.current_value, h.market.change_24h, "24h change")?;
            let change = amount::div(weighted, divisor, "24h change")?;
            change_24h_value = amount::add(change_24h_value, change, "24h change")?;
        }

        Ok(Self {
            portfolio,
            holdings_count: holdings.len(),
            total_value,
            total_cost,
            total_gain_loss,
            total_gain_loss_percentage,
            change_24h_value,
        })
    }
}
