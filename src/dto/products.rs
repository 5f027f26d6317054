use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Product, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub farmer_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub is_discount: bool,
    pub stock: i32,
    pub status: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub is_discount: Option<bool>,
    pub stock: Option<i32>,
    pub status: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductStatusRequest {
    pub status: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchStatusRequest {
    pub ids: Vec<i64>,
    pub status: i32,
}

/// A product joined with its farmer and category.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub farmer: Option<User>,
    pub category: Option<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductDetail>)]
    pub items: Vec<ProductDetail>,
}
