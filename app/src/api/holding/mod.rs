use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use domain::SortDirection;
use domain::enrichment::EnrichedHolding;
use domain::holding::{Holding, HoldingId, HoldingUpdate};
use domain::sort;
use domain::transaction::{NewTransaction, Transaction, TransactionSortColumn};
use domain::transaction_service::RecordedTransaction;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use uuid::Uuid;

use super::AppState;
use super::auth::AuthUser;
use super::error::{ApiResult, ErrorBody};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListQuery {
    /// Column to sort by, creation order when absent
    pub sort_by: Option<TransactionSortColumn>,
    /// `asc` (default) or `desc`
    #[param(value_type = Option<String>)]
    pub sort_direction: Option<SortDirection>,
}

pub fn router(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .with_state(state)
        .routes(routes!(get_holding, update_holding, delete_holding))
        .routes(routes!(list_transactions, record_transaction))
}

/// Get holding by UUID
///
/// The holding is priced together with the rest of its portfolio, so the
/// allocation is relative to the whole portfolio
#[utoipa::path(
    get,
    path = "/{holding_id}",
    params(
        ("holding_id" = Uuid, Path, description = "Holding UUID")
    ),
    responses(
        (status = 200, description = "Holding found", body = EnrichedHolding),
        (status = 403, description = "Holding belongs to another user", body = ErrorBody),
        (status = 404, description = "Holding not found", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::HOLDING_TAG
)]
async fn get_holding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(holding_id): Path<HoldingId>,
) -> ApiResult<Json<EnrichedHolding>> {
    let holding = state
        .tracker()
        .holdings
        .get_holding(&user_id, &holding_id)
        .await?;
    Ok(Json(holding))
}

/// Update holding by UUID
///
/// Only the provided fields are changed
#[utoipa::path(
    put,
    path = "/{holding_id}",
    params(
        ("holding_id" = Uuid, Path, description = "Holding UUID")
    ),
    request_body = HoldingUpdate,
    responses(
        (status = 200, description = "Holding updated", body = Holding),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 403, description = "Holding belongs to another user", body = ErrorBody),
        (status = 404, description = "Holding not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::HOLDING_TAG
)]
async fn update_holding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(holding_id): Path<HoldingId>,
    Json(payload): Json<HoldingUpdate>,
) -> ApiResult<Json<Holding>> {
    let holding = state
        .tracker()
        .holdings
        .update_holding(&user_id, &holding_id, payload)
        .await?;
    Ok(Json(holding))
}

/// Delete holding by UUID
///
/// Its transactions are deleted too
#[utoipa::path(
    delete,
    path = "/{holding_id}",
    params(
        ("holding_id" = Uuid, Path, description = "Holding UUID")
    ),
    responses(
        (status = 204, description = "Holding deleted"),
        (status = 403, description = "Holding belongs to another user", body = ErrorBody),
        (status = 404, description = "Holding not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::HOLDING_TAG
)]
async fn delete_holding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(holding_id): Path<HoldingId>,
) -> ApiResult<StatusCode> {
    state
        .tracker()
        .holdings
        .delete_holding(&user_id, &holding_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the transactions of a holding
#[utoipa::path(
    get,
    path = "/{holding_id}/transactions",
    params(
        ("holding_id" = Uuid, Path, description = "Holding UUID"),
        TransactionListQuery
    ),
    responses(
        (status = 200, description = "Transactions of the holding", body = Vec<Transaction>),
        (status = 403, description = "Holding belongs to another user", body = ErrorBody),
        (status = 404, description = "Holding not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::HOLDING_TAG
)]
async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(holding_id): Path<HoldingId>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let sort = sort::resolve(query.sort_by, query.sort_direction);
    let transactions = state
        .tracker()
        .transactions
        .list_transactions(&user_id, &holding_id, sort)
        .await?;
    Ok(Json(transactions))
}

/// Record a buy or sell
///
/// Buys update the average cost; sells may not exceed the held quantity
#[utoipa::path(
    post,
    path = "/{holding_id}/transactions",
    params(
        ("holding_id" = Uuid, Path, description = "Holding UUID")
    ),
    request_body = NewTransaction,
    responses(
        (status = 201, description = "Transaction recorded", body = RecordedTransaction),
        (status = 400, description = "Invalid request data or overselling", body = ErrorBody),
        (status = 403, description = "Holding belongs to another user", body = ErrorBody),
        (status = 404, description = "Holding not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::HOLDING_TAG
)]
async fn record_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(holding_id): Path<HoldingId>,
    Json(payload): Json<NewTransaction>,
) -> ApiResult<(StatusCode, Json<RecordedTransaction>)> {
    let recorded = state
        .tracker()
        .transactions
        .record_transaction(&user_id, &holding_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

#[cfg(test)]
mod tests;
