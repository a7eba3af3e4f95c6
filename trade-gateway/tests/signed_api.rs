//! End-to-end tests over the router: requests are signed exactly the way a
//! real client would sign them, then driven through the service with
//! `oneshot`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use gateway::BrokerSession;
use gateway_paper::PaperSession;
use serde_json::{json, Value};
use tower::ServiceExt;

use trade_gateway::api;
use trade_gateway::auth::SignatureVerifier;
use trade_gateway::registry::TraderRegistry;
use trade_gateway::state::AppState;

const CLIENT_ID: &str = "outer_client_001";
const SECRET: &str = "test_secret_key";

fn app(sessions: Vec<Arc<dyn BrokerSession>>) -> Router {
    let mut clients = HashMap::new();
    clients.insert(CLIENT_ID.to_string(), SECRET.to_string());
    let state = AppState {
        registry: Arc::new(TraderRegistry::new(sessions)),
        verifier: Arc::new(SignatureVerifier::new(clients, 300)),
    };
    api::router(state)
}

fn three_cash_accounts() -> Vec<Arc<dyn BrokerSession>> {
    (0..3)
        .map(|i| {
            Arc::new(PaperSession::new(format!("ACC{}", i), None, 100_000.0))
                as Arc<dyn BrokerSession>
        })
        .collect()
}

fn signed_with(
    method: &str,
    path: &str,
    body: Option<&Value>,
    timestamp: i64,
    secret: &str,
) -> Request<Body> {
    // serde_json's map is ordered, so this is the canonical sorted-key form.
    let body_string = body
        .map(|v| serde_json::to_string(v).unwrap())
        .unwrap_or_default();
    let timestamp = timestamp.to_string();
    let message =
        SignatureVerifier::signing_string(method, path, "", &body_string, &timestamp, CLIENT_ID);
    let signature = SignatureVerifier::sign(secret, &message).unwrap();

    Request::builder()
        .method(method)
        .uri(path)
        .header("X-Client-ID", CLIENT_ID)
        .header("X-Timestamp", timestamp)
        .header("X-Signature", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body_string))
        .unwrap()
}

fn signed(method: &str, path: &str, body: Option<&Value>) -> Request<Body> {
    signed_with(method, path, body, Utc::now().timestamp(), SECRET)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_signature() {
    let app = app(three_cash_accounts());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let app = app(three_cash_accounts());
    let response = app
        .oneshot(Request::get("/accounts").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_accounts_listing_works() {
    let app = app(three_cash_accounts());
    let response = app
        .oneshot(signed("GET", "/accounts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let accounts = json["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 3);
    assert_eq!(accounts[0]["index"], 0);
    assert_eq!(accounts[2]["account_id"], "ACC2");
}

#[tokio::test]
async fn buy_broadcasts_to_all_accounts() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "price": 10.5, "shares": 500, "price_type": 1});
    let response = app
        .clone()
        .oneshot(signed("POST", "/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["executed_count"], 3);
    assert_eq!(json["failed_count"], 0);
    assert_eq!(json["outcome"], "full");

    // The fill landed on every book.
    let response = app
        .oneshot(signed("GET", "/positions/2", None))
        .await
        .unwrap();
    let json = body_json(response).await;
    let positions = json["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["symbol"], "000001.SZ");
    assert_eq!(positions[0]["volume"], 500);
}

#[tokio::test]
async fn buy_with_selector_targets_one_account() {
    let app = app(three_cash_accounts());
    let body = json!({
        "symbol": "000001", "price": 10.5, "shares": 500,
        "price_type": 1, "trader_index": 0
    });
    let response = app
        .clone()
        .oneshot(signed("POST", "/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["trader_index"], 0);

    // Account 1 was not touched.
    let response = app
        .oneshot(signed("GET", "/positions/1", None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["positions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "price": 10.5, "shares": 500});
    let mut request = signed("POST", "/buy", Some(&body));
    // Flip the quantity after signing.
    let tampered = json!({"symbol": "000001", "price": 10.5, "shares": 5000});
    *request.body_mut() = Body::from(serde_json::to_string(&tampered).unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "price": 10.5, "shares": 500});
    let request = signed_with("POST", "/buy", Some(&body), Utc::now().timestamp(), "bad_key");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "price": 10.5, "shares": 500});
    let request = signed_with(
        "POST",
        "/buy",
        Some(&body),
        Utc::now().timestamp() - 4000,
        SECRET,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ambiguous_sizing_is_a_400() {
    let app = app(three_cash_accounts());
    let body = json!({
        "symbol": "000001", "trade_price": 10.5,
        "position_pct": 0.5, "order_num": 500
    });
    let response = app
        .oneshot(signed("POST", "/outer/trade/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn odd_lot_is_a_400() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "trade_price": 10.5, "order_num": 150});
    let response = app
        .oneshot(signed("POST", "/outer/trade/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bond_lots_of_ten_pass_validation() {
    let app = app(three_cash_accounts());
    let body = json!({
        "symbol": "123077", "trade_price": 120.0,
        "order_num": 30, "price_type": 1
    });
    let response = app
        .oneshot(signed("POST", "/outer/trade/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "full");
}

#[tokio::test]
async fn out_of_range_selector_is_a_400_before_dispatch() {
    let app = app(three_cash_accounts());
    let body = json!({
        "symbol": "000001", "price": 10.5, "shares": 500,
        "price_type": 1, "trader_index": 5
    });
    let response = app
        .clone()
        .oneshot(signed("POST", "/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was placed anywhere.
    let response = app
        .oneshot(signed("GET", "/positions/0", None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["positions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_operation_is_a_400() {
    let app = app(three_cash_accounts());
    let body = json!({"symbol": "000001", "trade_price": 10.5, "order_num": 500});
    let response = app
        .oneshot(signed("POST", "/outer/trade/short", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sell_batch_reports_partial_failure_in_order() {
    let sessions: Vec<Arc<dyn BrokerSession>> = vec![
        Arc::new(PaperSession::new("ACC0", None, 0.0).with_position("600036.SH", 500, 30.0)),
        Arc::new(PaperSession::new("ACC1", None, 0.0)),
        Arc::new(PaperSession::new("ACC2", None, 0.0).with_position("600036.SH", 500, 30.0)),
    ];
    let app = app(sessions);

    let body = json!({
        "symbol": "600036", "trade_price": 30.0,
        "order_num": 500, "price_type": 1
    });
    let response = app
        .oneshot(signed("POST", "/outer/trade/sell", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["executed_count"], 2);
    assert_eq!(json["failed_count"], 1);
    assert_eq!(json["outcome"], "partial");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for (i, entry) in results.iter().enumerate() {
        assert_eq!(entry["trader_index"], i);
    }
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[2]["status"], "success");
    assert!(results[1]["error"].as_str().unwrap().contains("not held"));
}

#[tokio::test]
async fn reverse_repo_parks_idle_cash_on_every_account() {
    let app = app(three_cash_accounts());
    let body = json!({"reserve_amount": 500.0});
    let response = app
        .oneshot(signed("POST", "/trade/nhg", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "full");
    // (100000 - 500) / 100 = 995 -> rounded down to 990 units.
    assert_eq!(json["results"][0]["result"]["order_num"], 990);
}

#[tokio::test]
async fn negative_reserve_is_a_400() {
    let app = app(three_cash_accounts());
    let body = json!({"reserve_amount": -1.0});
    let response = app
        .oneshot(signed("POST", "/trade/nhg", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_flow_over_resting_limit_orders() {
    let app = app(three_cash_accounts());

    // Limit orders rest on the paper book.
    let body = json!({"symbol": "000001", "price": 10.0, "shares": 200, "price_type": 0});
    let response = app
        .clone()
        .oneshot(signed("POST", "/buy", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let placed = body_json(response).await;
    let order_id = placed["results"][1]["result"]["order_id"]
        .as_str()
        .unwrap()
        .to_string();

    // Cancel one order on account 1 directly.
    let body = json!({"order_id": order_id, "trader_index": 1});
    let response = app
        .clone()
        .oneshot(signed("POST", "/cancel_order", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Cancel-all sweeps the remaining two accounts' buy orders.
    let response = app
        .clone()
        .oneshot(signed("POST", "/cancel_orders/buy", Some(&json!({}))))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "full");
    assert_eq!(json["results"][0]["result"]["cancelled"], 1);
    assert_eq!(json["results"][1]["result"]["cancelled"], 0);
    assert_eq!(json["results"][2]["result"]["cancelled"], 1);

    // No cancelable orders remain on account 0.
    let body = json!({"trader_index": 0, "cancelable_only": true});
    let response = app
        .oneshot(signed("POST", "/orders", Some(&body)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn trade_moves_every_account_to_target() {
    let app = app(three_cash_accounts());
    let body = json!({
        "symbol": "000001", "trade_price": 10.0,
        "position_pct": 0.5, "price_type": 1
    });
    let response = app
        .clone()
        .oneshot(signed("POST", "/trade", Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "full");
    // 50% of 100k at 10.0 -> 5000 shares.
    assert_eq!(json["results"][0]["result"]["order_num"], 5000);

    let response = app
        .oneshot(signed("GET", "/portfolio/0", None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["portfolio"]["cash"], 50_000.0);
}
