use axum::{Router, http::Method, http::StatusCode};
use domain::watchlist::NewWatchlistItem;
use serde_json::Value;

use crate::api::test_support::{TestApp, request, send};

fn app(test: &TestApp) -> Router {
    let (router, _api) = crate::api::market::router(test.handle.clone()).split_for_parts();
    router.with_state(test.handle.clone())
}

#[tokio::test]
async fn test_quotes_for_requested_symbols() {
    let test = TestApp::new();
    let app = app(&test);

    let (status, body): (_, Vec<Value>) = send(
        &app,
        request(
            Method::GET,
            "/quotes?symbols=btc,%20xyz,BTC",
            Some(&test.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 2);

    let btc = &body[0];
    assert_eq!(btc["symbol"], "BTC");
    assert_eq!(btc["available"], true);
    assert_eq!(btc["trend"], "up");
    assert_eq!(btc["price_display"], "$50,000.00");
    assert_eq!(btc["change_24h_display"], "+2.50%");
    assert_eq!(btc["market_cap_display"], "980.00B");
    assert_eq!(btc["volume_display"], "25.00B");

    let unknown = &body[1];
    assert_eq!(unknown["symbol"], "XYZ");
    assert_eq!(unknown["available"], false);
    assert_eq!(unknown["trend"], "neutral");
    assert_eq!(test.prices.call_count(), 1);
}

#[tokio::test]
async fn test_quotes_default_to_watchlist() {
    let test = TestApp::new();
    let app = app(&test);

    let (status, body): (_, Vec<Value>) =
        send(&app, request(Method::GET, "/quotes", Some(&test.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(test.prices.call_count(), 0);

    let watchlist = &test.handle.tracker().watchlist;
    for symbol in ["ETH", "BTC"] {
        watchlist
            .add_to_watchlist(
                &test.user,
                NewWatchlistItem {
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    let (_, body): (_, Vec<Value>) =
        send(&app, request(Method::GET, "/quotes", Some(&test.token), None)).await;
    let symbols: Vec<&str> = body.iter().map(|q| q["symbol"].as_str().unwrap()).collect();
    assert_eq!(symbols, ["BTC", "ETH"]);
    assert_eq!(body[1]["trend"], "down");
    assert_eq!(body[1]["change_24h_display"], "-2.50%");
}

#[tokio::test]
async fn test_quotes_reject_malformed_symbol() {
    let test = TestApp::new();
    let app = app(&test);

    let (status, body): (_, Value) = send(
        &app,
        request(Method::GET, "/quotes?symbols=BTC,%24%24", Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(test.prices.call_count(), 0);
}

#[tokio::test]
async fn test_quotes_outage_is_unavailable() {
    let test = TestApp::new();
    let app = app(&test);
    test.prices.set_failing(true);

    let (status, _body): (_, Value) = send(
        &app,
        request(Method::GET, "/quotes?symbols=BTC", Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
