use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_swagger_ui::SwaggerUi;

use crate::services::TrackerHandle;

pub mod auth;
pub mod error;
mod holding;
mod market;
mod portfolio;
mod watchlist;

#[cfg(test)]
mod test_support;

const PORTFOLIO_TAG: &str = "portfolio";
const HOLDING_TAG: &str = "holding";
const WATCHLIST_TAG: &str = "watchlist";
const MARKET_TAG: &str = "market";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
    ),
    components(
        schemas(
            error::ErrorBody,
            domain::portfolio::Portfolio,
            domain::portfolio::PortfolioSummary,
            domain::holding::Holding,
            domain::enrichment::EnrichedHolding,
            domain::transaction::Transaction,
            domain::watchlist::WatchlistItem,
            domain::enrichment::EnrichedWatchlistItem,
            domain::market_data::MarketQuote,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = PORTFOLIO_TAG, description = "Portfolios and their holdings"),
        (name = HOLDING_TAG, description = "Single holdings and their transactions"),
        (name = WATCHLIST_TAG, description = "Watched symbols with live market data"),
        (name = MARKET_TAG, description = "Market quotes")
    )
)]
struct ApiDoc;

/// Get health of the API.
#[utoipa::path(
    method(get, head),
    path = "/api/health",
    responses(
        (status = OK, description = "Success", body = str, content_type = "text/plain")
    )
)]
async fn health() -> &'static str {
    "ok"
}

pub type AppState = TrackerHandle;

pub fn create_api(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health))
        .nest("/api/portfolios", portfolio::router(state.clone()))
        .nest("/api/holdings", holding::router(state.clone()))
        .nest("/api/watchlist", watchlist::router(state.clone()))
        .nest("/api/market", market::router(state.clone()))
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/apidoc/openapi.json", api))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::Value;

    use super::*;
    use crate::api::test_support::{TestApp, request, send};

    #[tokio::test]
    async fn test_openapi_document_describes_ids_as_uuid_strings() {
        let app = create_api(TestApp::new().handle);
        let (status, doc): (_, Value) =
            send(&app, request(Method::GET, "/apidoc/openapi.json", None, None)).await;
        assert_eq!(status, StatusCode::OK);

        let schemas = &doc["components"]["schemas"];
        for (schema, field) in [
            ("Holding", "id"),
            ("Holding", "portfolio_id"),
            ("Portfolio", "id"),
            ("Portfolio", "user_id"),
            ("Transaction", "holding_id"),
            ("WatchlistItem", "user_id"),
            ("TotalValueResponse", "portfolio_id"),
        ] {
            let property = &schemas[schema]["properties"][field];
            assert_eq!(property["type"], "string", "{schema}.{field}");
            assert_eq!(property["format"], "uuid", "{schema}.{field}");
        }
    }
}
