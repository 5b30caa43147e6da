use database_adapter::db::DbError;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{Result, TrackerError};
use crate::holding::{Holding, HoldingId};
use crate::sort::Sort;
use crate::store::Store;
use crate::transaction::{NewTransaction, Transaction, TransactionRepoExt, TransactionSortColumn};
use crate::user::UserId;

/// A recorded trade together with the holding it changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub holding: Holding,
}

#[derive(Debug, Clone)]
pub struct TransactionService {
    store: Store,
}

impl TransactionService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// # Errors
    /// `NotFound`/`Unauthorized` for the holding
    pub async fn list_transactions(
        &self,
        user_id: &UserId,
        holding_id: &HoldingId,
        sort: Option<Sort<TransactionSortColumn>>,
    ) -> Result<Vec<Transaction>> {
        self.store.owned_holding(user_id, holding_id).await?;
        Ok(self
            .store
            .transactions
            .find_all_for_holding(holding_id, sort)
            .await?)
    }

    /// Records a trade and moves the holding's quantity and average cost.
    /// Trades on one holding are applied one at a time. The transaction row
    /// is written first and taken back out if the holding cannot be updated.
    /// # Errors
    /// `Validation` for bad input or overselling, `NotFound`/`Unauthorized` for the holding
    pub async fn record_transaction(
        &self,
        user_id: &UserId,
        holding_id: &HoldingId,
        input: NewTransaction,
    ) -> Result<RecordedTransaction> {
        input.check()?;
        let _guard = self.store.lock_holding(holding_id).await;
        let (_, holding) = self.store.owned_holding(user_id, holding_id).await?;

        let transaction = input.into_transaction(*holding_id)?;
        let updated = transaction.apply_to(&holding)?;

        let transaction = self
            .store
            .transactions
            .create_transaction(transaction)
            .await?;
        if let Err(e) = self.store.holdings.update(*holding_id, updated.clone()).await {
            error!(
                "Failed to update holding {} after transaction {}: {}",
                holding_id, transaction.id, e
            );
            self.store.transactions.remove(transaction.id).await?;
            return Err(match e {
                DbError::NotFound(_) => TrackerError::not_found("Holding", holding_id),
                other => other.into(),
            });
        }

        info!(
            "Recorded {:?} of {} {} at {}",
            transaction.transaction_type,
            transaction.quantity,
            updated.symbol,
            transaction.price_per_unit
        );
        Ok(RecordedTransaction {
            transaction,
            holding: updated,
        })
    }
}
