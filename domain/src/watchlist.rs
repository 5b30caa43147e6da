use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_adapter::db::{DbError, Repository};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::TrackerError;
use crate::market_data::{check_symbol, normalize_symbol};
use crate::sort::{Sort, sort_columns};
use crate::user::UserId;

pub type WatchlistItemId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WatchlistItem {
    #[schema(value_type = String, format = Uuid)]
    pub id: WatchlistItemId,
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    /// Uppercase ticker, unique per user
    pub symbol: String,
    pub name: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewWatchlistItem {
    #[validate(length(min = 1, max = 20))]
    pub symbol: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl NewWatchlistItem {
    /// # Errors
    /// `TrackerError::Validation` when a field is out of range
    pub fn check(&self) -> Result<(), TrackerError> {
        self.validate()?;
        check_symbol(&self.symbol)
    }

    #[must_use]
    pub fn into_item(self, user_id: UserId) -> WatchlistItem {
        WatchlistItem {
            id: Uuid::new_v4(),
            user_id,
            symbol: normalize_symbol(&self.symbol),
            name: self.name.trim().to_string(),
            notes: self.notes.filter(|n| !n.is_empty()),
            added_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct WatchlistItemUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// An empty string clears the notes
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl WatchlistItemUpdate {
    pub fn apply(&self, item: &mut WatchlistItem) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone()).filter(|n| !n.is_empty());
        }
    }
}

sort_columns! {
    WatchlistSortColumn {
        Symbol => ("symbol", Text),
        Name => ("name", Text),
        AddedAt => ("added_at", Timestamp),
    }
}

pub type WatchlistRepo = dyn Repository<WatchlistItem, WatchlistItemId>;

#[async_trait]
pub trait WatchlistRepoExt {
    async fn find_all_items(
        &self,
        user_id: &UserId,
        sort: Option<Sort<WatchlistSortColumn>>,
    ) -> Result<Vec<WatchlistItem>, DbError>;
    async fn find_item_by_symbol(
        &self,
        user_id: &UserId,
        symbol: &str,
    ) -> Result<Option<WatchlistItem>, DbError>;
    async fn item_exists(&self, user_id: &UserId, symbol: &str) -> Result<bool, DbError>;
    /// # Errors
    /// `DbError::UniqueViolation` when the user already watches the symbol
    async fn create_item(&self, item: WatchlistItem) -> Result<WatchlistItem, DbError>;
    /// # Errors
    /// `DbError::NotFound` when `id` does not resolve
    async fn update_item(
        &self,
        id: &WatchlistItemId,
        update: &WatchlistItemUpdate,
    ) -> Result<WatchlistItem, DbError>;
}

#[async_trait]
impl<R> WatchlistRepoExt for R
where
    R: Repository<WatchlistItem, WatchlistItemId> + ?Sized,
{
    async fn find_all_items(
        &self,
        user_id: &UserId,
        sort: Option<Sort<WatchlistSortColumn>>,
    ) -> Result<Vec<WatchlistItem>, DbError> {
        let order = sort.map(|s| s.order());
        let rows = self
            .find_all_by_field("user_id", &user_id.to_string(), order.as_ref())
            .await?;
        Ok(rows.into_iter().map(|(_, item)| item).collect())
    }

    async fn find_item_by_symbol(
        &self,
        user_id: &UserId,
        symbol: &str,
    ) -> Result<Option<WatchlistItem>, DbError> {
        let user_id = user_id.to_string();
        let symbol = normalize_symbol(symbol);
        let row = self
            .find_by_fields(&[("user_id", user_id.as_str()), ("symbol", symbol.as_str())])
            .await?;
        Ok(row.map(|(_, item)| item))
    }

    async fn item_exists(&self, user_id: &UserId, symbol: &str) -> Result<bool, DbError> {
        Ok(self.find_item_by_symbol(user_id, symbol).await?.is_some())
    }

    async fn create_item(&self, item: WatchlistItem) -> Result<WatchlistItem, DbError> {
        self.insert(item.id, item.clone()).await?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: &WatchlistItemId,
        update: &WatchlistItemUpdate,
    ) -> Result<WatchlistItem, DbError> {
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        update.apply(&mut item);
        self.update(*id, item.clone()).await?;
        Ok(item)
    }
}
