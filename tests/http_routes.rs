mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::fixture;
use farm_market_api::{models::ProductReference, routes::create_api_router, state::AppState};
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_router())
        .with_state(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn create_order_over_http() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 5).await;

    let payload = serde_json::json!({
        "user_id": fx.buyer.id,
        "product_id": product.id,
        "quantity": 3,
        "price": "10.00",
        "recv_address": "12 Orchard Lane",
        "recv_phone": "13800000000"
    });
    let request = Request::post("/api/order")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["data"]["total_price"], "30.00");
    assert_eq!(body["data"]["status"], 0);
    assert_eq!(fx.product(product.id).await.stock, 2);
}

#[tokio::test]
async fn missing_order_renders_error_envelope() {
    let fx = fixture().await;
    let request = Request::get("/api/order/4242").body(Body::empty()).unwrap();

    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json(&body);
    assert_eq!(body["data"]["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Order not found");
}

#[tokio::test]
async fn refund_before_payment_is_a_conflict() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 5).await;
    let order = fx.place_order(&product, 1).await;

    let request = Request::post(format!("/api/order/{}/refund", order.id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"reason":"too slow"}"#))
        .unwrap();

    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["data"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn referenced_product_delete_is_a_conflict() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 5).await;
    fx.store.add_reference(ProductReference::Cart, product.id).await;

    let request = Request::delete(format!("/api/product/{}", product.id))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let body = json(&body);
    assert_eq!(body["data"]["code"], "REFERENTIAL_CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("cart record"));
}

#[tokio::test]
async fn product_page_accepts_sort_parameters() {
    let fx = fixture().await;
    fx.add_product("Heirloom Tomatoes", dec!(12.00), 5).await;
    fx.add_product("Cherry Tomatoes", dec!(9.00), 5).await;

    let request = Request::get("/api/product/page?sort_field=price&sort_order=asc&per_page=1")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["data"][0]["name"], "Cherry Tomatoes");
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["per_page"], 1);
}

#[tokio::test]
async fn notify_answers_plain_text() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 3).await;
    let order_id = order.id.to_string();

    let forged = format!("out_trade_no={order_id}&trade_status=TRADE_SUCCESS&sign=Zm9yZ2Vk");
    let request = Request::post("/api/alipay/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(forged))
        .unwrap();
    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"failure");

    let params = fx.signed_notify(&[
        ("out_trade_no", order_id.as_str()),
        ("trade_status", "TRADE_SUCCESS"),
    ]);
    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode_form(v)))
        .collect::<Vec<_>>()
        .join("&");
    let request = Request::post("/api/alipay/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encoded))
        .unwrap();
    let (_, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(body, b"success");
    assert_eq!(fx.product(product.id).await.sales_count, 3);
}

#[tokio::test]
async fn pay_page_returns_html_form() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 2).await;

    let request = Request::get(format!("/api/alipay/pay/{}", order.id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(fx.state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.starts_with("<form name=\"punchout_form\""));
}

// Base64 signatures carry `+`, `/` and `=`, which must survive form decoding.
fn encode_form(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}
