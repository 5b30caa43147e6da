use std::collections::HashMap;
use std::sync::Arc;

use database_adapter::db::{DbError, PgPool, PostgresRepo};
use in_memory_adapter::InMemoryRepo;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::holding::{Holding, HoldingId, HoldingRepo, HoldingRepoExt};
use crate::portfolio::{Portfolio, PortfolioId, PortfolioRepo};
use crate::transaction::{Transaction, TransactionId, TransactionRepo, TransactionRepoExt};
use crate::user::UserId;
use crate::watchlist::{WatchlistItem, WatchlistItemId, WatchlistRepo};

const HOLDING_KEY: &[&str] = &["portfolio_id", "symbol"];
const WATCHLIST_KEY: &[&str] = &["user_id", "symbol"];

type HoldingLocks = Arc<Mutex<HashMap<HoldingId, Arc<Mutex<()>>>>>;

/// The four entity repositories behind the tracker, plus the cascades and
/// ownership checks that span more than one of them.
///
/// Read-modify-write on a holding is serialised by a per-holding lock held
/// by this process. Several processes sharing one database are not covered.
#[derive(Clone)]
pub struct Store {
    pub portfolios: Arc<PortfolioRepo>,
    pub holdings: Arc<HoldingRepo>,
    pub transactions: Arc<TransactionRepo>,
    pub watchlist: Arc<WatchlistRepo>,
    holding_locks: HoldingLocks,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            portfolios: Arc::new(InMemoryRepo::<Portfolio, PortfolioId>::new()),
            holdings: Arc::new(InMemoryRepo::<Holding, HoldingId>::with_unique_key(
                HOLDING_KEY,
            )),
            transactions: Arc::new(InMemoryRepo::<Transaction, TransactionId>::new()),
            watchlist: Arc::new(InMemoryRepo::<WatchlistItem, WatchlistItemId>::with_unique_key(
                WATCHLIST_KEY,
            )),
            holding_locks: HoldingLocks::default(),
        }
    }

    /// Opens (and creates when missing) the document tables.
    /// # Errors
    /// Returns `DbError` if a table cannot be created
    pub async fn postgres(pool: PgPool) -> Result<Self, DbError> {
        let portfolios =
            PostgresRepo::<Portfolio, PortfolioId>::new(pool.clone(), "portfolios", &[]).await?;
        let holdings =
            PostgresRepo::<Holding, HoldingId>::new(pool.clone(), "holdings", HOLDING_KEY).await?;
        let transactions =
            PostgresRepo::<Transaction, TransactionId>::new(pool.clone(), "transactions", &[])
                .await?;
        let watchlist = PostgresRepo::<WatchlistItem, WatchlistItemId>::new(
            pool,
            "watchlist_items",
            WATCHLIST_KEY,
        )
        .await?;
        info!("Postgres store ready");

        Ok(Self {
            portfolios: Arc::new(portfolios),
            holdings: Arc::new(holdings),
            transactions: Arc::new(transactions),
            watchlist: Arc::new(watchlist),
            holding_locks: HoldingLocks::default(),
        })
    }

    /// Exclusive access to one holding until the guard is dropped.
    pub async fn lock_holding(&self, holding_id: &HoldingId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.holding_locks.lock().await;
            Arc::clone(locks.entry(*holding_id).or_default())
        };
        lock.lock_owned().await
    }

    async fn forget_holding_lock(&self, holding_id: &HoldingId) {
        self.holding_locks.lock().await.remove(holding_id);
    }

    /// The portfolio, if it exists and belongs to `user_id`.
    /// # Errors
    /// `NotFound` for an unknown id, `Unauthorized` for another user's portfolio
    pub async fn owned_portfolio(
        &self,
        user_id: &UserId,
        portfolio_id: &PortfolioId,
    ) -> Result<Portfolio, TrackerError> {
        let portfolio = self
            .portfolios
            .get(portfolio_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Portfolio", portfolio_id))?;
        if portfolio.user_id != *user_id {
            return Err(TrackerError::unauthorized("Portfolio", portfolio_id));
        }
        Ok(portfolio)
    }

    /// The holding and its portfolio, if the portfolio belongs to `user_id`.
    /// # Errors
    /// `NotFound` for an unknown id, `Unauthorized` for another user's holding
    pub async fn owned_holding(
        &self,
        user_id: &UserId,
        holding_id: &HoldingId,
    ) -> Result<(Portfolio, Holding), TrackerError> {
        let holding = self
            .holdings
            .get(holding_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Holding", holding_id))?;
        let portfolio = self
            .portfolios
            .get(&holding.portfolio_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Holding", holding_id))?;
        if portfolio.user_id != *user_id {
            return Err(TrackerError::unauthorized("Holding", holding_id));
        }
        Ok((portfolio, holding))
    }

    /// # Errors
    /// `NotFound` for an unknown id, `Unauthorized` for another user's item
    pub async fn owned_watchlist_item(
        &self,
        user_id: &UserId,
        item_id: &WatchlistItemId,
    ) -> Result<WatchlistItem, TrackerError> {
        let item = self
            .watchlist
            .get(item_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Watchlist item", item_id))?;
        if item.user_id != *user_id {
            return Err(TrackerError::unauthorized("Watchlist item", item_id));
        }
        Ok(item)
    }

    /// Removes the holding after its transactions, so none are left orphaned.
    /// # Errors
    /// `DbError::NotFound` when the holding does not exist
    pub async fn delete_holding(&self, holding_id: &HoldingId) -> Result<(), DbError> {
        let guard = self.lock_holding(holding_id).await;
        let removed = self.transactions.remove_for_holding(holding_id).await?;
        self.holdings.remove(*holding_id).await?;
        drop(guard);
        self.forget_holding_lock(holding_id).await;
        debug!("Deleted holding {holding_id} and {removed} transaction(s)");
        Ok(())
    }

    /// Removes the portfolio with all of its holdings and their transactions.
    /// # Errors
    /// `DbError::NotFound` when the portfolio does not exist
    pub async fn delete_portfolio(&self, portfolio_id: &PortfolioId) -> Result<(), DbError> {
        for holding in self.holdings.find_all_for_portfolio(portfolio_id, None).await? {
            self.delete_holding(&holding.id).await?;
        }
        self.portfolios.remove(*portfolio_id).await?;
        debug!("Deleted portfolio {portfolio_id}");
        Ok(())
    }
}
