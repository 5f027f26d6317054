use std::collections::BTreeMap;

use axum::{
    Form, Router,
    extract::{Path, State},
    response::Html,
    routing::{get, post},
};

use crate::{error::AppResult, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pay/{order_id}", get(pay_page))
        .route("/notify", post(notify))
}

#[utoipa::path(
    get,
    path = "/api/alipay/pay/{order_id}",
    params(("order_id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Auto-submitting gateway form, empty when it could not be built", content_type = "text/html", body = String),
        (status = 404, description = "Order or product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Payments"
)]
pub async fn pay_page(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> AppResult<Html<String>> {
    let form = state.payments.create_payment(order_id).await?;
    Ok(Html(form))
}

/// Gateway callback. The plain-text reply tells the gateway whether to
/// deliver again.
#[utoipa::path(
    post,
    path = "/api/alipay/notify",
    request_body(content = BTreeMap<String, String>, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "`success` or `failure`", content_type = "text/plain", body = String)
    ),
    tag = "Payments"
)]
pub async fn notify(
    State(state): State<AppState>,
    Form(params): Form<BTreeMap<String, String>>,
) -> &'static str {
    let outcome = state.payments.handle_notify(params).await;
    tracing::debug!(?outcome, "payment notification handled");
    outcome.reply()
}
