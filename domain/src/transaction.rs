use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_adapter::db::{DbError, Repository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::amount;
use crate::error::TrackerError;
use crate::holding::{Holding, HoldingId, check_price, check_quantity};
use crate::sort::{Sort, sort_columns};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

/// A recorded trade. Transactions are never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[schema(value_type = String, format = Uuid)]
    pub id: TransactionId,
    #[schema(value_type = String, format = Uuid)]
    pub holding_id: HoldingId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    /// quantity × price per unit + fee
    pub total_cost: Decimal,
    pub fee: Option<Decimal>,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub fee: Option<Decimal>,
    /// Defaults to now
    pub transaction_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl NewTransaction {
    /// # Errors
    /// `TrackerError::Validation` when a field is out of range
    pub fn check(&self) -> Result<(), TrackerError> {
        self.validate()?;
        check_quantity(self.quantity)?;
        check_price("price_per_unit", self.price_per_unit)?;
        if let Some(fee) = self.fee {
            check_price("fee", fee)?;
        }
        Ok(())
    }

    /// # Errors
    /// `TrackerError::Validation` when the cost leaves the decimal range
    pub fn total_cost(&self) -> Result<Decimal, TrackerError> {
        let gross = amount::mul(self.quantity, self.price_per_unit, "total cost")?;
        amount::add(gross, self.fee.unwrap_or_default(), "total cost")
    }

    /// # Errors
    /// `TrackerError::Validation` when the cost leaves the decimal range
    pub fn into_transaction(self, holding_id: HoldingId) -> Result<Transaction, TrackerError> {
        let now = Utc::now();
        let total_cost = self.total_cost()?;
        Ok(Transaction {
            id: Uuid::new_v4(),
            holding_id,
            transaction_type: self.transaction_type,
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            total_cost,
            fee: self.fee,
            transaction_date: self.transaction_date.unwrap_or(now),
            notes: self.notes.filter(|n| !n.is_empty()),
            created_at: now,
        })
    }
}

impl Transaction {
    /// The holding after this trade. Buys move the average cost towards the
    /// trade price; sells leave it unchanged.
    /// # Errors
    /// `TrackerError::Validation` when selling more than is held or when a buy
    /// pushes the quantity past the accepted maximum
    pub fn apply_to(&self, holding: &Holding) -> Result<Holding, TrackerError> {
        let mut next = holding.clone();
        match self.transaction_type {
            TransactionType::Buy => {
                let quantity = amount::add(holding.quantity, self.quantity, "quantity")?;
                check_quantity(quantity)?;
                let bought = amount::mul(self.quantity, self.price_per_unit, "average cost")?;
                let cost = amount::add(holding.cost_basis()?, bought, "average cost")?;
                next.average_cost = amount::div(cost, quantity, "average cost")?;
                next.quantity = quantity;
            }
            TransactionType::Sell => {
                if self.quantity > holding.quantity {
                    return Err(TrackerError::validation(format!(
                        "cannot sell {} {}, only {} held",
                        self.quantity, holding.symbol, holding.quantity
                    )));
                }
                next.quantity = holding.quantity - self.quantity;
            }
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

sort_columns! {
    TransactionSortColumn {
        TransactionDate => ("transaction_date", Timestamp),
        Quantity => ("quantity", Numeric),
        PricePerUnit => ("price_per_unit", Numeric),
        TotalCost => ("total_cost", Numeric),
        CreatedAt => ("created_at", Timestamp),
    }
}

pub type TransactionRepo = dyn Repository<Transaction, TransactionId>;

#[async_trait]
pub trait TransactionRepoExt {
    async fn find_all_for_holding(
        &self,
        holding_id: &HoldingId,
        sort: Option<Sort<TransactionSortColumn>>,
    ) -> Result<Vec<Transaction>, DbError>;
    async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction, DbError>;
    /// Removes every transaction of the holding, returning how many went
    async fn remove_for_holding(&self, holding_id: &HoldingId) -> Result<u64, DbError>;
}

#[async_trait]
impl<R> TransactionRepoExt for R
where
    R: Repository<Transaction, TransactionId> + ?Sized,
{
    async fn find_all_for_holding(
        &self,
        holding_id: &HoldingId,
        sort: Option<Sort<TransactionSortColumn>>,
    ) -> Result<Vec<Transaction>, DbError> {
        let order = sort.map(|s| s.order());
        let rows = self
            .find_all_by_field("holding_id", &holding_id.to_string(), order.as_ref())
            .await?;
        Ok(rows.into_iter().map(|(_, t)| t).collect())
    }

    async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction, DbError> {
        self.insert(transaction.id, transaction.clone()).await?;
        Ok(transaction)
    }

    async fn remove_for_holding(&self, holding_id: &HoldingId) -> Result<u64, DbError> {
        self.remove_all_by_field("holding_id", &holding_id.to_string())
            .await
    }
}
