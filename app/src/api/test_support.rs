use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use domain::core::CoinTracker;
use domain::market_data::{PriceSnapshot, StaticPriceProvider};
use domain::user::UserId;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use crate::api::auth::JwtKeys;
use crate::services::TrackerHandle;

pub struct TestApp {
    pub handle: TrackerHandle,
    pub prices: Arc<StaticPriceProvider>,
    pub user: UserId,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let prices = Arc::new(StaticPriceProvider::with_prices([
            PriceSnapshot::new("BTC", dec!(50000))
                .with_changes(dec!(0.1), dec!(2.5), dec!(4))
                .with_market_cap(dec!(980000000000))
                .with_volume(dec!(25000000000)),
            PriceSnapshot::new("ETH", dec!(3500)).with_changes(dec!(0), dec!(-2.5), dec!(1)),
        ]));
        let keys = JwtKeys::from_secret(b"test-secret");
        let user = Uuid::new_v4();
        let token = keys.create_jwt(user).unwrap();
        let handle = TrackerHandle::new(CoinTracker::in_memory(prices.clone()), keys);
        Self {
            handle,
            prices,
            user,
            token,
        }
    }

    pub fn token_for(&self, user: UserId) -> String {
        self.handle.keys().create_jwt(user).unwrap()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends the request and decodes a JSON body
pub async fn send<T: DeserializeOwned>(app: &Router, request: Request<Body>) -> (StatusCode, T) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Sends the request and returns only the status
pub async fn send_empty(app: &Router, request: Request<Body>) -> StatusCode {
    app.clone().oneshot(request).await.unwrap().status()
}
