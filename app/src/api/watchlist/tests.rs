use axum::{Router, http::Method, http::StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::test_support::{TestApp, request, send, send_empty};

fn app(test: &TestApp) -> Router {
    let (router, _api) = crate::api::watchlist::router(test.handle.clone()).split_for_parts();
    router.with_state(test.handle.clone())
}

async fn watch(app: &Router, token: &str, symbol: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::POST,
            "/",
            Some(token),
            Some(json!({ "symbol": symbol, "name": format!("{symbol} coin") })),
        ),
    )
    .await
}

#[tokio::test]
async fn test_empty_watchlist_skips_market_data() {
    let test = TestApp::new();
    let app = app(&test);

    let (status, body): (_, Vec<Value>) =
        send(&app, request(Method::GET, "/", Some(&test.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(test.prices.call_count(), 0);
}

#[tokio::test]
async fn test_watch_normalises_and_enriches() {
    let test = TestApp::new();
    let app = app(&test);

    let (status, item) = watch(&app, &test.token, "btc").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["symbol"], "BTC");
    watch(&app, &test.token, "doge").await;

    let (status, body): (_, Vec<Value>) =
        send(&app, request(Method::GET, "/", Some(&test.token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["symbol"], "BTC");
    assert_eq!(body[0]["current_price"], "50000");
    assert_eq!(body[0]["trend"], "up");
    assert_eq!(body[1]["symbol"], "DOGE");
    assert_eq!(body[1]["current_price"], "0");
    assert_eq!(body[1]["trend"], "neutral");
    assert_eq!(test.prices.call_count(), 1);

    let (status, check): (_, Value) = send(
        &app,
        request(Method::GET, "/check/btc", Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["symbol"], "BTC");
    assert_eq!(check["in_watchlist"], true);
}

#[tokio::test]
async fn test_duplicate_watch_is_conflict() {
    let test = TestApp::new();
    let app = app(&test);

    watch(&app, &test.token, "ETH").await;
    let (status, body) = watch(&app, &test.token, "eth").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("ETH"));
}

#[tokio::test]
async fn test_remove_requires_ownership() {
    let test = TestApp::new();
    let app = app(&test);
    let (_, item) = watch(&app, &test.token, "BTC").await;
    let id = item["id"].as_str().unwrap();

    let intruder = test.token_for(Uuid::new_v4());
    let status = send_empty(&app, request(Method::DELETE, &format!("/{id}"), Some(&intruder), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body): (_, Vec<Value>) =
        send(&app, request(Method::GET, "/", Some(&test.token), None)).await;
    assert_eq!(body.len(), 1);

    let status = send_empty(
        &app,
        request(Method::DELETE, &format!("/{id}"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = send_empty(
        &app,
        request(Method::DELETE, &format!("/{id}"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_notes() {
    let test = TestApp::new();
    let app = app(&test);
    let (_, item) = watch(&app, &test.token, "SOL").await;
    let id = item["id"].as_str().unwrap();

    let (status, body): (_, Value) = send(
        &app,
        request(
            Method::PUT,
            &format!("/{id}"),
            Some(&test.token),
            Some(json!({ "notes": "staking" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "staking");
    assert_eq!(body["name"], "SOL coin");
}
