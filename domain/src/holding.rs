use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_adapter::db::{DbError, Repository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::amount::{self, MAX_AMOUNT};
use crate::error::TrackerError;
use crate::market_data::{check_symbol, normalize_symbol};
use crate::portfolio::PortfolioId;
use crate::sort::{Sort, sort_columns};

pub type HoldingId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Holding {
    #[schema(value_type = String, format = Uuid)]
    pub id: HoldingId,
    #[schema(value_type = String, format = Uuid)]
    pub portfolio_id: PortfolioId,
    /// Uppercase ticker, unique within the portfolio
    pub symbol: String,
    pub name: String,
    pub quantity: Decimal,
    /// Average cost per unit
    pub average_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// quantity × average cost
    /// # Errors
    /// `TrackerError::Validation` when the product leaves the decimal range
    pub fn cost_basis(&self) -> Result<Decimal, TrackerError> {
        amount::mul(self.quantity, self.average_cost, "cost basis")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewHolding {
    #[validate(length(min = 1, max = 20))]
    pub symbol: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

pub(crate) fn check_quantity(quantity: Decimal) -> Result<(), TrackerError> {
    if quantity <= Decimal::ZERO {
        return Err(TrackerError::validation("quantity must be greater than zero"));
    }
    if quantity > MAX_AMOUNT {
        return Err(TrackerError::validation(format!(
            "quantity must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

pub(crate) fn check_price(field: &str, price: Decimal) -> Result<(), TrackerError> {
    if price < Decimal::ZERO {
        return Err(TrackerError::validation(format!("{field} must not be negative")));
    }
    if price > MAX_AMOUNT {
        return Err(TrackerError::validation(format!(
            "{field} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

impl NewHolding {
    /// # Errors
    /// `TrackerError::Validation` when a field is out of range
    pub fn check(&self) -> Result<(), TrackerError> {
        self.validate()?;
        check_symbol(&self.symbol)?;
        check_quantity(self.quantity)?;
        check_price("average_cost", self.average_cost)
    }

    #[must_use]
    pub fn into_holding(self, portfolio_id: PortfolioId) -> Holding {
        let now = Utc::now();
        Holding {
            id: Uuid::new_v4(),
            portfolio_id,
            symbol: normalize_symbol(&self.symbol),
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            average_cost: self.average_cost,
            notes: self.notes.filter(|n| !n.is_empty()),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct HoldingUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub average_cost: Option<Decimal>,
    /// An empty string clears the notes
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl HoldingUpdate {
    /// # Errors
    /// `TrackerError::Validation` when a supplied field is out of range
    pub fn check(&self) -> Result<(), TrackerError> {
        self.validate()?;
        if let Some(quantity) = self.quantity {
            check_quantity(quantity)?;
        }
        if let Some(average_cost) = self.average_cost {
            check_price("average_cost", average_cost)?;
        }
        Ok(())
    }

    pub fn apply(&self, holding: &mut Holding) {
        if let Some(name) = &self.name {
            holding.name = name.trim().to_string();
        }
        if let Some(quantity) = self.quantity {
            holding.quantity = quantity;
        }
        if let Some(average_cost) = self.average_cost {
            holding.average_cost = average_cost;
        }
        if let Some(notes) = &self.notes {
            holding.notes = Some(notes.clone()).filter(|n| !n.is_empty());
        }
        holding.updated_at = Utc::now();
    }
}

sort_columns! {
    HoldingSortColumn {
        Symbol => ("symbol", Text),
        Name => ("name", Text),
        Quantity => ("quantity", Numeric),
        AverageCost => ("average_cost", Numeric),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}

pub type HoldingRepo = dyn Repository<Holding, HoldingId>;

#[async_trait]
pub trait HoldingRepoExt {
    /// Holdings of one portfolio, in creation order unless `sort` is given
    async fn find_all_for_portfolio(
        &self,
        portfolio_id: &PortfolioId,
        sort: Option<Sort<HoldingSortColumn>>,
    ) -> Result<Vec<Holding>, DbError>;
    async fn find_by_symbol(
        &self,
        portfolio_id: &PortfolioId,
        symbol: &str,
    ) -> Result<Option<Holding>, DbError>;
    async fn symbol_exists(&self, portfolio_id: &PortfolioId, symbol: &str)
    -> Result<bool, DbError>;
    /// # Errors
    /// `DbError::UniqueViolation` when the portfolio already holds the symbol
    async fn create_holding(&self, holding: Holding) -> Result<Holding, DbError>;
    /// # Errors
    /// `DbError::NotFound` when `id` does not resolve
    async fn update_holding(&self, id: &HoldingId, update: &HoldingUpdate)
    -> Result<Holding, DbError>;
    /// Sum of quantity × price, where unpriced symbols count as 0
    /// # Errors
    /// `TrackerError::Validation` when the total leaves the decimal range
    async fn get_total_value(
        &self,
        portfolio_id: &PortfolioId,
        prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, TrackerError>;
    /// Distinct symbols in first-seen order
    async fn get_symbols(&self, portfolio_id: &PortfolioId) -> Result<Vec<String>, DbError>;
}

#[async_trait]
impl<R> HoldingRepoExt for R
where
    R: Repository<Holding, HoldingId> + ?Sized,
{
    async fn find_all_for_portfolio(
        &self,
        portfolio_id: &PortfolioId,
        sort: Option<Sort<HoldingSortColumn>>,
    ) -> Result<Vec<Holding>, DbError> {
        let order = sort.map(|s| s.order());
        let rows = self
            .find_all_by_field("portfolio_id", &portfolio_id.to_string(), order.as_ref())
            .await?;
        Ok(rows.into_iter().map(|(_, h)| h).collect())
    }

    async fn find_by_symbol(
        &self,
        portfolio_id: &PortfolioId,
        symbol: &str,
    ) -> Result<Option<Holding>, DbError> {
        let portfolio_id = portfolio_id.to_string();
        let symbol = normalize_symbol(symbol);
        let row = self
            .find_by_fields(&[
                ("portfolio_id", portfolio_id.as_str()),
                ("symbol", symbol.as_str()),
            ])
            .await?;
        Ok(row.map(|(_, h)| h))
    }

    async fn symbol_exists(
        &self,
        portfolio_id: &PortfolioId,
        symbol: &str,
    ) -> Result<bool, DbError> {
        Ok(self.find_by_symbol(portfolio_id, symbol).await?.is_some())
    }

    async fn create_holding(&self, holding: Holding) -> Result<Holding, DbError> {
        self.insert(holding.id, holding.clone()).await?;
        Ok(holding)
    }

    async fn update_holding(
        &self,
        id: &HoldingId,
        update: &HoldingUpdate,
    ) -> Result<Holding, DbError> {
        let mut holding = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        update.apply(&mut holding);
        self.update(*id, holding.clone()).await?;
        Ok(holding)
    }

    async fn get_total_value(
        &self,
        portfolio_id: &PortfolioId,
        prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, TrackerError> {
        let holdings = self.find_all_for_portfolio(portfolio_id, None).await?;
        let values = holdings
            .iter()
            .map(|h| {
                let price = prices.get(&h.symbol).copied().unwrap_or_default();
                amount::mul(h.quantity, price, "holding value")
            })
            .collect::<Result<Vec<_>, _>>()?;
        amount::sum(values, "total value")
    }

    async fn get_symbols(&self, portfolio_id: &PortfolioId) -> Result<Vec<String>, DbError> {
        let holdings = self.find_all_for_portfolio(portfolio_id, None).await?;
        let mut symbols: Vec<String> = Vec::with_capacity(holdings.len());
        for holding in holdings {
            if !symbols.contains(&holding.symbol) {
                symbols.push(holding.symbol);
            }
        }
        Ok(symbols)
    }
}
