use database_adapter::db::{DbError, SortDirection};
use tracing::{debug, info};

use crate::enrichment::{EnrichedWatchlistItem, enrich_watchlist};
use crate::error::{Result, TrackerError};
use crate::market_data::{MarketDataService, check_symbol};
use crate::sort::Sort;
use crate::store::Store;
use crate::user::UserId;
use crate::watchlist::{
    NewWatchlistItem, WatchlistItem, WatchlistItemId, WatchlistItemUpdate, WatchlistRepoExt,
    WatchlistSortColumn,
};

#[derive(Debug, Clone)]
pub struct WatchlistService {
    store: Store,
    market_data: MarketDataService,
}

impl WatchlistService {
    #[must_use]
    pub fn new(store: Store, market_data: MarketDataService) -> Self {
        Self { store, market_data }
    }

    /// The user's watchlist priced in one batch. An empty watchlist makes no
    /// market data call.
    /// # Errors
    /// `UpstreamUnavailable` when pricing fails
    pub async fn get_watchlist(
        &self,
        user_id: &UserId,
        sort: Option<Sort<WatchlistSortColumn>>,
    ) -> Result<Vec<EnrichedWatchlistItem>> {
        let items = self.store.watchlist.find_all_items(user_id, sort).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let symbols: Vec<String> = items.iter().map(|item| item.symbol.clone()).collect();
        let prices = self.market_data.get_current_prices(&symbols).await?;
        Ok(enrich_watchlist(
            items,
            &prices,
            self.market_data.trend_threshold(),
        ))
    }

    /// # Errors
    /// `Validation` for bad input, `AlreadyExists` when the symbol is already watched
    pub async fn add_to_watchlist(
        &self,
        user_id: &UserId,
        input: NewWatchlistItem,
    ) -> Result<WatchlistItem> {
        input.check()?;
        let item = input.into_item(*user_id);
        let symbol = item.symbol.clone();
        let item = self
            .store
            .watchlist
            .create_item(item)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation(_) => TrackerError::AlreadyExists {
                    entity: "Watchlist item",
                    key: symbol.clone(),
                },
                other => other.into(),
            })?;
        info!("User {} is now watching {}", user_id, item.symbol);
        Ok(item)
    }

    /// # Errors
    /// `Validation` for bad input, `NotFound`/`Unauthorized` for the item
    pub async fn update_watchlist_item(
        &self,
        user_id: &UserId,
        item_id: &WatchlistItemId,
        update: WatchlistItemUpdate,
    ) -> Result<WatchlistItem> {
        validator::Validate::validate(&update)?;
        self.store.owned_watchlist_item(user_id, item_id).await?;
        Ok(self
            .store
            .watchlist
            .update_item(item_id, &update)
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Watchlist item", item_id),
                other => other.into(),
            })?)
    }

    /// The ownership check runs before the delete, so another user's item is
    /// never touched.
    /// # Errors
    /// `NotFound` for an unknown id, `Unauthorized` for another user's item
    pub async fn remove_from_watchlist(
        &self,
        user_id: &UserId,
        item_id: &WatchlistItemId,
    ) -> Result<()> {
        let item = self.store.owned_watchlist_item(user_id, item_id).await?;
        self.store
            .watchlist
            .remove(*item_id)
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::not_found("Watchlist item", item_id),
                other => other.into(),
            })?;
        info!("User {} stopped watching {}", user_id, item.symbol);
        Ok(())
    }

    /// # Errors
    /// `Validation` for a malformed symbol
    pub async fn is_in_watchlist(&self, user_id: &UserId, symbol: &str) -> Result<bool> {
        check_symbol(symbol)?;
        let watched = self.store.watchlist.item_exists(user_id, symbol).await?;
        debug!("{symbol} watched by {user_id}: {watched}");
        Ok(watched)
    }

    /// Symbols the user watches, alphabetically.
    /// # Errors
    /// Storage failures only
    pub async fn watched_symbols(&self, user_id: &UserId) -> Result<Vec<String>> {
        let sort = Sort::new(WatchlistSortColumn::Symbol, SortDirection::Asc);
        let items = self.store.watchlist.find_all_items(user_id, Some(sort)).await?;
        Ok(items.into_iter().map(|item| item.symbol).collect())
    }
}
