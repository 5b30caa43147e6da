use axum::{Router, http::Method, http::StatusCode};
use domain::holding::NewHolding;
use domain::portfolio::NewPortfolio;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::test_support::{TestApp, request, send, send_empty};

fn app(test: &TestApp) -> Router {
    let (router, _api) = crate::api::holding::router(test.handle.clone()).split_for_parts();
    router.with_state(test.handle.clone())
}

/// Portfolio with BTC (2 @ 50000) and ETH (10 @ 3000); returns the BTC holding id
async fn seed(test: &TestApp) -> Uuid {
    let tracker = test.handle.tracker();
    let portfolio = tracker
        .portfolios
        .create_portfolio(
            &test.user,
            NewPortfolio {
                name: "Main".to_string(),
                ..NewPortfolio::default()
            },
        )
        .await
        .unwrap();
    let mut ids = Vec::new();
    for (symbol, quantity, cost) in [("BTC", dec!(2), dec!(50000)), ("ETH", dec!(10), dec!(3000))] {
        let holding = tracker
            .holdings
            .add_holding(
                &test.user,
                &portfolio.id,
                NewHolding {
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    quantity,
                    average_cost: cost,
                    notes: None,
                },
            )
            .await
            .unwrap();
        ids.push(holding.id);
    }
    ids[0]
}

#[tokio::test]
async fn test_get_holding_allocation_is_portfolio_relative() {
    let test = TestApp::new();
    let app = app(&test);
    let btc = seed(&test).await;

    let (status, body): (_, Value) = send(
        &app,
        request(Method::GET, &format!("/{btc}"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "BTC");
    assert_eq!(body["current_value"], "100000");
    let allocation: f64 = body["allocation_percentage"].as_str().unwrap().parse().unwrap();
    assert!((allocation - 74.07).abs() < 0.01);
}

#[tokio::test]
async fn test_update_holding_partially() {
    let test = TestApp::new();
    let app = app(&test);
    let btc = seed(&test).await;

    let (status, body): (_, Value) = send(
        &app,
        request(
            Method::PUT,
            &format!("/{btc}"),
            Some(&test.token),
            Some(json!({ "notes": "cold wallet" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "cold wallet");
    assert_eq!(body["quantity"], "2");
    assert_eq!(body["average_cost"], "50000");

    let status = send_empty(
        &app,
        request(
            Method::PUT,
            &format!("/{btc}"),
            Some(&test.token_for(Uuid::new_v4())),
            Some(json!({ "notes": "mine now" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_record_and_list_transactions() {
    let test = TestApp::new();
    let app = app(&test);
    let btc = seed(&test).await;

    let (status, body): (_, Value) = send(
        &app,
        request(
            Method::POST,
            &format!("/{btc}/transactions"),
            Some(&test.token),
            Some(json!({ "type": "BUY", "quantity": "2", "price_per_unit": "60000", "fee": "10" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["transaction"]["type"], "BUY");
    assert_eq!(body["transaction"]["total_cost"], "120010");
    assert_eq!(body["holding"]["quantity"], "4");
    assert_eq!(body["holding"]["average_cost"], "55000");

    let (status, body): (_, Value) = send(
        &app,
        request(
            Method::POST,
            &format!("/{btc}/transactions"),
            Some(&test.token),
            Some(json!({ "type": "SELL", "quantity": "10", "price_per_unit": "60000" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot sell"));

    let (status, body): (_, Vec<Value>) = send(
        &app,
        request(
            Method::GET,
            &format!("/{btc}/transactions?sort_by=total_cost&sort_direction=desc"),
            Some(&test.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 1);
}

#[tokio::test]
async fn test_delete_holding() {
    let test = TestApp::new();
    let app = app(&test);
    let btc = seed(&test).await;

    let status = send_empty(
        &app,
        request(Method::DELETE, &format!("/{btc}"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = send_empty(
        &app,
        request(Method::GET, &format!("/{btc}"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status = send_empty(
        &app,
        request(Method::GET, &format!("/{btc}/transactions"), Some(&test.token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
