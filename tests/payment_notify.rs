mod common;

use std::sync::Arc;

use common::{NOTIFY_URL, fixture};
use farm_market_api::{
    error::AppError,
    models::OrderStatus,
    payment::{GatewayError, PaymentGateway, PaymentRequest},
    services::{NotifyOutcome, PaymentService},
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn invalid_signature_never_changes_state() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 3).await;
    let order_id = order.id.to_string();

    for trade_status in ["TRADE_SUCCESS", "TRADE_CLOSED", "WAIT_BUYER_PAY"] {
        let mut params = fx.signed_notify(&[
            ("out_trade_no", order_id.as_str()),
            ("trade_status", trade_status),
        ]);
        params.insert("total_amount".into(), "0.01".into());

        let outcome = fx.state.payments.handle_notify(params).await;
        assert_eq!(outcome, NotifyOutcome::Rejected);
    }

    let mut unsigned = fx.signed_notify(&[
        ("out_trade_no", order_id.as_str()),
        ("trade_status", "TRADE_SUCCESS"),
    ]);
    unsigned.remove("sign");
    assert_eq!(
        fx.state.payments.handle_notify(unsigned).await,
        NotifyOutcome::Rejected
    );

    let stored = fx.product(product.id).await;
    assert_eq!(stored.stock, 7);
    assert_eq!(stored.sales_count, 0);
    assert_eq!(fx.order(order.id).await.status, OrderStatus::CREATED);
}

#[tokio::test]
async fn trade_success_marks_paid_and_duplicates_apply_once() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 3).await;
    let order_id = order.id.to_string();
    let params = fx.signed_notify(&[
        ("app_id", "2021000000000000"),
        ("out_trade_no", order_id.as_str()),
        ("trade_no", "2026101822001400000000000001"),
        ("trade_status", "TRADE_SUCCESS"),
        ("buyer_memo", ""),
    ]);

    let first = fx.state.payments.handle_notify(params.clone()).await;
    assert_eq!(first, NotifyOutcome::Applied(order.id));
    assert!(first.acknowledged());

    let stored = fx.product(product.id).await;
    assert_eq!(stored.stock, 4);
    assert_eq!(stored.sales_count, 3);
    assert_eq!(fx.order(order.id).await.status, OrderStatus::PAID);

    let second = fx.state.payments.handle_notify(params).await;
    assert_eq!(second, NotifyOutcome::AlreadyPaid(order.id));
    assert_eq!(second.reply(), "success");

    let stored = fx.product(product.id).await;
    assert_eq!(stored.stock, 4);
    assert_eq!(stored.sales_count, 3);
}

#[tokio::test]
async fn other_trade_status_is_acknowledged_without_mutation() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 3).await;
    let order_id = order.id.to_string();

    let params = fx.signed_notify(&[
        ("out_trade_no", order_id.as_str()),
        ("trade_status", "WAIT_BUYER_PAY"),
    ]);
    assert_eq!(
        fx.state.payments.handle_notify(params).await,
        NotifyOutcome::Skipped
    );
    assert_eq!(fx.order(order.id).await.status, OrderStatus::CREATED);
    assert_eq!(fx.product(product.id).await.stock, 7);
}

#[tokio::test]
async fn unknown_or_malformed_trade_numbers_are_rejected() {
    let fx = fixture().await;

    let unknown = fx.signed_notify(&[("out_trade_no", "777"), ("trade_status", "TRADE_SUCCESS")]);
    assert_eq!(
        fx.state.payments.handle_notify(unknown).await,
        NotifyOutcome::Rejected
    );

    let malformed =
        fx.signed_notify(&[("out_trade_no", "ORD-1"), ("trade_status", "TRADE_SUCCESS")]);
    assert_eq!(
        fx.state.payments.handle_notify(malformed).await,
        NotifyOutcome::Rejected
    );
}

#[tokio::test]
async fn payment_form_carries_order_amount_and_subject() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 3).await;

    let form = fx.state.payments.create_payment(order.id).await.unwrap();

    assert!(form.contains("alipay.trade.page.pay"));
    assert!(form.contains("&quot;total_amount&quot;:&quot;30.00&quot;"));
    assert!(form.contains("Heirloom Tomatoes"));
    assert!(form.contains(NOTIFY_URL));
}

#[tokio::test]
async fn payment_form_requires_order_and_stock() {
    let fx = fixture().await;
    let err = fx.state.payments.create_payment(31337).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let product = fx.add_product("Snow Peas", dec!(15.00), 4).await;
    let order = fx.place_order(&product, 3).await;
    let err = fx.state.payments.create_payment(order.id).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
}

struct BrokenGateway;

impl PaymentGateway for BrokenGateway {
    fn create_payment_form(&self, _request: &PaymentRequest) -> Result<String, GatewayError> {
        Err(GatewayError::InvalidRequest("gateway offline".into()))
    }
}

#[tokio::test]
async fn gateway_failure_yields_an_empty_form() {
    let fx = fixture().await;
    let product = fx.add_product("Heirloom Tomatoes", dec!(10.00), 10).await;
    let order = fx.place_order(&product, 1).await;

    let payments = PaymentService::new(
        Arc::new(fx.store.clone()),
        Arc::new(fx.store.clone()),
        Arc::new(BrokenGateway),
        Arc::new(fx.signer.clone()),
        NOTIFY_URL.into(),
        "http://localhost:8080/orders".into(),
        Arc::new(fx.store.clone()),
    );

    let form = payments.create_payment(order.id).await.unwrap();
    assert!(form.is_empty());
}
