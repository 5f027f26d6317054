use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, Product, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub recv_address: Option<String>,
    pub recv_phone: Option<String>,
}

/// Fields a caller may overwrite. Ownership, product, creation time and the
/// total are fixed once the order exists.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub status: Option<i32>,
    pub refund_status: Option<i32>,
    pub refund_reason: Option<String>,
    pub recv_address: Option<String>,
    pub recv_phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefundOrderRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAddressRequest {
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchIdsRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchDeleteResult {
    pub deleted: u64,
}

/// An order joined with its buyer, product and the product's farmer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<User>,
    pub product: Option<Product>,
    pub farmer: Option<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderDetail>,
}
