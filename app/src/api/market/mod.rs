use axum::{
    Json,
    extract::{Query, State},
};
use domain::market_data::{MarketQuote, check_symbol};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use super::AppState;
use super::auth::AuthUser;
use super::error::{ApiResult, ErrorBody};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    /// Comma separated tickers, the user's watchlist when absent
    pub symbols: Option<String>,
}

impl QuoteQuery {
    fn symbols(&self) -> Option<Vec<String>> {
        let symbols: Vec<String> = self
            .symbols
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        (!symbols.is_empty()).then_some(symbols)
    }
}

pub fn router(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .with_state(state)
        .routes(routes!(get_quotes))
}

/// Get market quotes
///
/// One batched provider request for the distinct symbols. Symbols the
/// provider does not know come back with `available = false`.
#[utoipa::path(
    get,
    path = "/quotes",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Quotes in request order", body = Vec<MarketQuote>),
        (status = 400, description = "Malformed symbol", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 503, description = "Market data unavailable", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = super::MARKET_TAG
)]
async fn get_quotes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<Json<Vec<MarketQuote>>> {
    let tracker = state.tracker();
    let symbols = match query.symbols() {
        Some(symbols) => {
            for symbol in &symbols {
                check_symbol(symbol)?;
            }
            symbols
        }
        None => tracker.watchlist.watched_symbols(&user_id).await?,
    };
    let quotes = tracker.market_data.get_quotes(&symbols).await?;
    Ok(Json(quotes))
}

#[cfg(test)]
mod tests;
