use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use domain::SortDirection;
use domain::enrichment::EnrichedWatchlistItem;
use domain::sort;
use domain::watchlist::{
    NewWatchlistItem, WatchlistItem, WatchlistItemId, WatchlistItemUpdate, WatchlistSortColumn,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use uuid::Uuid;

use super::AppState;
use super::auth::AuthUser;
use super::error::{ApiResult, ErrorBody};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WatchlistQuery {
    /// Column to sort by, creation order when absent
    pub sort_by: Option<WatchlistSortColumn>,
    /// `asc` (default) or `desc`
    #[param(value_type = Option<String>)]
    pub sort_direction: Option<SortDirection>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WatchlistCheck {
    pub symbol: String,
    pub in_watchlist: bool,
}

pub fn router(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .with_state(state)
        .routes(routes!(get_watchlist, add_to_watchlist))
        .routes(routes!(update_watchlist_item, remove_from_watchlist))
        .routes(routes!(check_symbol))
}

/// Get the watchlist with live market data
///
/// Items without a price are returned with zeroed market fields and a
/// neutral trend
#[utoipa::path(
    get,
    path = "/",
    params(WatchlistQuery),
    responses(
        (status = 200, description = "Enriched watchlist", body = Vec<EnrichedWatchlistItem>),
        (status = 400, description = "Unknown sort column or direction"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::WATCHLIST_TAG
)]
async fn get_watchlist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<WatchlistQuery>,
) -> ApiResult<Json<Vec<EnrichedWatchlistItem>>> {
    let sort = sort::resolve(query.sort_by, query.sort_direction);
    let items = state
        .tracker()
        .watchlist
        .get_watchlist(&user_id, sort)
        .await?;
    Ok(Json(items))
}

/// Watch a symbol
#[utoipa::path(
    post,
    path = "/",
    request_body = NewWatchlistItem,
    responses(
        (status = 201, description = "Symbol added", body = WatchlistItem),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 409, description = "Symbol already watched", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::WATCHLIST_TAG
)]
async fn add_to_watchlist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewWatchlistItem>,
) -> ApiResult<(StatusCode, Json<WatchlistItem>)> {
    let item = state
        .tracker()
        .watchlist
        .add_to_watchlist(&user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update the name or notes of a watched symbol
#[utoipa::path(
    put,
    path = "/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Watchlist item UUID")
    ),
    request_body = WatchlistItemUpdate,
    responses(
        (status = 200, description = "Item updated", body = WatchlistItem),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 403, description = "Item belongs to another user", body = ErrorBody),
        (status = 404, description = "Item not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::WATCHLIST_TAG
)]
async fn update_watchlist_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<WatchlistItemId>,
    Json(payload): Json<WatchlistItemUpdate>,
) -> ApiResult<Json<WatchlistItem>> {
    let item = state
        .tracker()
        .watchlist
        .update_watchlist_item(&user_id, &item_id, payload)
        .await?;
    Ok(Json(item))
}

/// Stop watching a symbol
#[utoipa::path(
    delete,
    path = "/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Watchlist item UUID")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 403, description = "Item belongs to another user", body = ErrorBody),
        (status = 404, description = "Item not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::WATCHLIST_TAG
)]
async fn remove_from_watchlist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<WatchlistItemId>,
) -> ApiResult<StatusCode> {
    state
        .tracker()
        .watchlist
        .remove_from_watchlist(&user_id, &item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether a symbol is watched
#[utoipa::path(
    get,
    path = "/check/{symbol}",
    params(
        ("symbol" = String, Path, description = "Ticker, any case")
    ),
    responses(
        (status = 200, description = "Watch status", body = WatchlistCheck),
        (status = 400, description = "Malformed symbol", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::WATCHLIST_TAG
)]
async fn check_symbol(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(symbol): Path<String>,
) -> ApiResult<Json<WatchlistCheck>> {
    let in_watchlist = state
        .tracker()
        .watchlist
        .is_in_watchlist(&user_id, &symbol)
        .await?;
    Ok(Json(WatchlistCheck {
        symbol: domain::market_data::normalize_symbol(&symbol),
        in_watchlist,
    }))
}

#[cfg(test)]
mod tests;
