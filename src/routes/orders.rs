use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};

use crate::{
    dto::orders::{
        BatchDeleteResult, BatchIdsRequest, CreateOrderRequest, OrderDetail, OrderList,
        RefundOrderRequest, UpdateAddressRequest, UpdateOrderRequest, UpdateOrderStatusRequest,
    },
    error::AppResult,
    models::Order,
    response::ApiResponse,
    routes::params::OrderPageQuery,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/page", get(list_orders))
        .route("/batch", delete(delete_orders))
        .route("/user/{user_id}", get(list_user_orders))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/status", put(update_order_status))
        .route("/{id}/pay", put(pay_order))
        .route("/{id}/refund", post(refund_order))
        .route("/{id}/address", put(update_order_address))
}

#[utoipa::path(
    post,
    path = "/api/order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<Order>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state.orders.create_order(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/order/page",
    params(OrderPageQuery),
    responses(
        (status = 200, description = "Paged orders with buyer, product and farmer", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderPageQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let response = state.orders.get_orders_by_page(query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/order/{id}",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let response = state.orders.get_order(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/order/user/{user_id}",
    params(("user_id" = i64, Path, description = "Buyer ID")),
    responses(
        (status = 200, description = "All orders of a buyer", body = ApiResponse<OrderList>),
        (status = 404, description = "No orders")
    ),
    tag = "Orders"
)]
pub async fn list_user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let response = state.orders.get_orders_by_user(user_id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/order/{id}",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order", body = ApiResponse<Order>)
    ),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state.orders.update_order(id, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/order/{id}",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deleted order")
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let response = state.orders.delete_order(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/order/batch",
    request_body = BatchIdsRequest,
    responses(
        (status = 200, description = "Deleted orders", body = ApiResponse<BatchDeleteResult>)
    ),
    tag = "Orders"
)]
pub async fn delete_orders(
    State(state): State<AppState>,
    Json(payload): Json<BatchIdsRequest>,
) -> AppResult<Json<ApiResponse<BatchDeleteResult>>> {
    let response = state.orders.delete_batch(payload.ids).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/order/{id}/status",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>)
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state.orders.update_order_status(id, payload.status).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/order/{id}/pay",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order paid", body = ApiResponse<Order>),
        (status = 409, description = "Insufficient stock or already paid")
    ),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state.orders.pay_order(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/order/{id}/refund",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = RefundOrderRequest,
    responses(
        (status = 200, description = "Refund requested", body = ApiResponse<Order>),
        (status = 409, description = "Order cannot be refunded")
    ),
    tag = "Orders"
)]
pub async fn refund_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RefundOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state.orders.refund_order(id, payload.reason).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/order/{id}/address",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<Order>),
        (status = 409, description = "Order already shipped")
    ),
    tag = "Orders"
)]
pub async fn update_order_address(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAddressRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let response = state
        .orders
        .update_order_address(id, payload.address, payload.phone)
        .await?;
    Ok(Json(response))
}
