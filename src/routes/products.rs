use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};

use crate::{
    dto::{
        orders::{BatchDeleteResult, BatchIdsRequest},
        products::{
            BatchStatusRequest, CreateProductRequest, ProductDetail, ProductList,
            UpdateProductRequest, UpdateProductStatusRequest,
        },
    },
    error::AppResult,
    models::Product,
    response::ApiResponse,
    routes::params::ProductPageQuery,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/page", get(list_products))
        .route("/batch", delete(delete_products))
        .route("/batch/status", put(update_batch_status))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/status", put(update_product_status))
}

#[utoipa::path(
    get,
    path = "/api/product/page",
    params(ProductPageQuery),
    responses(
        (status = 200, description = "Paged products with farmer and category", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductPageQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let response = state.catalog.get_products_by_page(query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/product/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let response = state.catalog.get_product(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/product",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let response = state.catalog.create_product(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/product/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let response = state.catalog.update_product(id, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/product/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 409, description = "Product still referenced")
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let response = state.catalog.delete_product(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/product/batch",
    request_body = BatchIdsRequest,
    responses(
        (status = 200, description = "Deleted products", body = ApiResponse<BatchDeleteResult>),
        (status = 409, description = "A product is still referenced")
    ),
    tag = "Products"
)]
pub async fn delete_products(
    State(state): State<AppState>,
    Json(payload): Json<BatchIdsRequest>,
) -> AppResult<Json<ApiResponse<BatchDeleteResult>>> {
    let response = state.catalog.delete_batch(payload.ids).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/product/{id}/status",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = UpdateProductStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn update_product_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductStatusRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let response = state.catalog.update_product_status(id, payload.status).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/product/batch/status",
    request_body = BatchStatusRequest,
    responses(
        (status = 200, description = "Statuses updated"),
        (status = 404, description = "Some products do not exist")
    ),
    tag = "Products"
)]
pub async fn update_batch_status(
    State(state): State<AppState>,
    Json(payload): Json<BatchStatusRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let response = state
        .catalog
        .update_batch_status(payload.ids, payload.status)
        .await?;
    Ok(Json(response))
}
