use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use domain::SortDirection;
use domain::enrichment::EnrichedHolding;
use domain::holding::{Holding, HoldingSortColumn, NewHolding};
use domain::portfolio::{
    NewPortfolio, Portfolio, PortfolioId, PortfolioSortColumn, PortfolioSummary, PortfolioUpdate,
};
use domain::sort;
use rust_decimal::Decimal;
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
pub struct PortfolioListQuery {
    /// Column to sort by, creation order when absent
    pub sort_by: Option<PortfolioSortColumn>,
    /// `asc` (default) or `desc`
    #[param(value_type = Option<String>)]
    pub sort_direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HoldingListQuery {
    /// Column to sort by, creation order when absent
    pub sort_by: Option<HoldingSortColumn>,
    /// `asc` (default) or `desc`
    #[param(value_type = Option<String>)]
    pub sort_direction: Option<SortDirection>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TotalValueResponse {
    #[schema(value_type = String, format = Uuid)]
    pub portfolio_id: PortfolioId,
    pub total_value: Decimal,
}

pub fn router(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .with_state(state)
        .routes(routes!(list_portfolios, create_portfolio))
        .routes(routes!(get_portfolio, update_portfolio, delete_portfolio))
        .routes(routes!(get_portfolio_summary))
        .routes(routes!(list_holdings, add_holding))
        .routes(routes!(get_total_value))
        .routes(routes!(get_symbols))
}

/// List portfolios
///
/// List the portfolios of the authenticated user
#[utoipa::path(
    get,
    path = "/",
    params(PortfolioListQuery),
    responses(
        (status = 200, description = "Portfolios of the user", body = Vec<Portfolio>),
        (status = 400, description = "Unknown sort column or direction"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn list_portfolios(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<PortfolioListQuery>,
) -> ApiResult<Json<Vec<Portfolio>>> {
    let sort = sort::resolve(query.sort_by, query.sort_direction);
    let portfolios = state
        .tracker()
        .portfolios
        .list_portfolios(&user_id, sort)
        .await?;
    Ok(Json(portfolios))
}

/// Create a portfolio
///
/// The user's first portfolio becomes the default one
#[utoipa::path(
    post,
    path = "/",
    request_body = NewPortfolio,
    responses(
        (status = 201, description = "Portfolio created", body = Portfolio),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn create_portfolio(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewPortfolio>,
) -> ApiResult<(StatusCode, Json<Portfolio>)> {
    let portfolio = state
        .tracker()
        .portfolios
        .create_portfolio(&user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(portfolio)))
}

/// Get portfolio by UUID
#[utoipa::path(
    get,
    path = "/{portfolio_id}",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    responses(
        (status = 200, description = "Portfolio found", body = Portfolio),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn get_portfolio(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
) -> ApiResult<Json<Portfolio>> {
    let portfolio = state
        .tracker()
        .portfolios
        .get_portfolio(&user_id, &portfolio_id)
        .await?;
    Ok(Json(portfolio))
}

/// Update portfolio by UUID
///
/// Only the provided fields are changed
#[utoipa::path(
    put,
    path = "/{portfolio_id}",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    request_body = PortfolioUpdate,
    responses(
        (status = 200, description = "Portfolio updated", body = Portfolio),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn update_portfolio(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
    Json(payload): Json<PortfolioUpdate>,
) -> ApiResult<Json<Portfolio>> {
    let portfolio = state
        .tracker()
        .portfolios
        .update_portfolio(&user_id, &portfolio_id, payload)
        .await?;
    Ok(Json(portfolio))
}

/// Delete portfolio by UUID
///
/// Its holdings and their transactions are deleted too
#[utoipa::path(
    delete,
    path = "/{portfolio_id}",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    responses(
        (status = 204, description = "Portfolio deleted"),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn delete_portfolio(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
) -> ApiResult<StatusCode> {
    state
        .tracker()
        .portfolios
        .delete_portfolio(&user_id, &portfolio_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Portfolio totals at live prices
#[utoipa::path(
    get,
    path = "/{portfolio_id}/summary",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    responses(
        (status = 200, description = "Portfolio summary", body = PortfolioSummary),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn get_portfolio_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
) -> ApiResult<Json<PortfolioSummary>> {
    let summary = state
        .tracker()
        .portfolios
        .get_portfolio_summary(&user_id, &portfolio_id)
        .await?;
    Ok(Json(summary))
}

/// List holdings with live market data
///
/// Holdings without a price are returned with zeroed market fields
#[utoipa::path(
    get,
    path = "/{portfolio_id}/holdings",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID"),
        HoldingListQuery
    ),
    responses(
        (status = 200, description = "Enriched holdings", body = Vec<EnrichedHolding>),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn list_holdings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
    Query(query): Query<HoldingListQuery>,
) -> ApiResult<Json<Vec<EnrichedHolding>>> {
    let sort = sort::resolve(query.sort_by, query.sort_direction);
    let holdings = state
        .tracker()
        .holdings
        .list_holdings(&user_id, &portfolio_id, sort)
        .await?;
    Ok(Json(holdings))
}

/// Add a holding to the portfolio
#[utoipa::path(
    post,
    path = "/{portfolio_id}/holdings",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    request_body = NewHolding,
    responses(
        (status = 201, description = "Holding created", body = Holding),
        (status = 400, description = "Invalid request data", body = ErrorBody),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody),
        (status = 409, description = "The portfolio already holds this symbol", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn add_holding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
    Json(payload): Json<NewHolding>,
) -> ApiResult<(StatusCode, Json<Holding>)> {
    let holding = state
        .tracker()
        .holdings
        .add_holding(&user_id, &portfolio_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(holding)))
}

/// Current value of the portfolio
#[utoipa::path(
    get,
    path = "/{portfolio_id}/holdings/total-value",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    responses(
        (status = 200, description = "Total value at live prices", body = TotalValueResponse),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn get_total_value(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
) -> ApiResult<Json<TotalValueResponse>> {
    let total_value = state
        .tracker()
        .holdings
        .get_total_value(&user_id, &portfolio_id)
        .await?;
    Ok(Json(TotalValueResponse {
        portfolio_id,
        total_value,
    }))
}

/// Distinct symbols held in the portfolio
#[utoipa::path(
    get,
    path = "/{portfolio_id}/holdings/symbols",
    params(
        ("portfolio_id" = Uuid, Path, description = "Portfolio UUID")
    ),
    responses(
        (status = 200, description = "Symbols in creation order", body = Vec<String>),
        (status = 403, description = "Portfolio belongs to another user", body = ErrorBody),
        (status = 404, description = "Portfolio not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::PORTFOLIO_TAG
)]
async fn get_symbols(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(portfolio_id): Path<PortfolioId>,
) -> ApiResult<Json<Vec<String>>> {
    let symbols = state
        .tracker()
        .holdings
        .get_symbols(&user_id, &portfolio_id)
        .await?;
    Ok(Json(symbols))
}
