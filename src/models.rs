use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle code of an order. Codes above `SHIPPED` are later fulfilment
/// stages and are accepted without an upper bound.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct OrderStatus(pub i32);

impl OrderStatus {
    pub const CREATED: OrderStatus = OrderStatus(0);
    pub const PAID: OrderStatus = OrderStatus(1);
    pub const SHIPPED: OrderStatus = OrderStatus(2);

    pub fn is_refundable(self) -> bool {
        self == Self::PAID || self == Self::SHIPPED
    }

    /// Anything past `PAID` has left the farm.
    pub fn is_shipped(self) -> bool {
        self > Self::PAID
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RefundStatus(pub i32);

impl RefundStatus {
    pub const NONE: RefundStatus = RefundStatus(0);
    pub const REQUESTED: RefundStatus = RefundStatus(1);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub farmer_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub is_discount: bool,
    pub stock: i32,
    pub sales_count: i32,
    pub status: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Largest value the `NUMERIC(10, 2)` price columns hold.
pub fn max_unit_price() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// `price * quantity`, or `None` when it overflows or no longer fits the
/// `NUMERIC(12, 2)` order total column.
pub fn line_total(price: Decimal, quantity: i32) -> Option<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| total.abs() <= Decimal::new(999_999_999_999, 2))
}

impl Product {
    pub fn effective_price(&self) -> Decimal {
        match (self.is_discount, self.discount_price) {
            (true, Some(discount)) => discount,
            _ => self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub last_status: Option<OrderStatus>,
    pub refund_status: RefundStatus,
    pub refund_reason: Option<String>,
    pub recv_address: Option<String>,
    pub recv_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order as handed to the store; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub refund_status: RefundStatus,
    pub recv_address: Option<String>,
    pub recv_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub farmer_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub is_discount: bool,
    pub stock: i32,
    pub status: i32,
    pub image_url: Option<String>,
}

/// Relations that keep a product from being deleted, in the order the
/// delete guard checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductReference {
    CarouselItem,
    Order,
    Cart,
    Review,
    Favorite,
}

impl ProductReference {
    pub const GUARD_ORDER: [ProductReference; 5] = [
        ProductReference::CarouselItem,
        ProductReference::Order,
        ProductReference::Cart,
        ProductReference::Review,
        ProductReference::Favorite,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            ProductReference::CarouselItem => "carousel item",
            ProductReference::Order => "order record",
            ProductReference::Cart => "cart record",
            ProductReference::Review => "review record",
            ProductReference::Favorite => "favorite record",
        }
    }
}

impl std::fmt::Display for ProductReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn refundable_only_when_paid_or_shipped() {
        assert!(!OrderStatus::CREATED.is_refundable());
        assert!(OrderStatus::PAID.is_refundable());
        assert!(OrderStatus::SHIPPED.is_refundable());
        assert!(!OrderStatus(3).is_refundable());
    }

    #[test]
    fn shipped_is_anything_past_paid() {
        assert!(!OrderStatus::PAID.is_shipped());
        assert!(OrderStatus::SHIPPED.is_shipped());
        assert!(OrderStatus(7).is_shipped());
    }

    #[test]
    fn effective_price_prefers_discount_when_flagged() {
        let mut product = Product {
            id: 1,
            farmer_id: 1,
            category_id: 1,
            name: "Tomatoes".into(),
            description: None,
            price: dec!(12.00),
            discount_price: Some(dec!(9.50)),
            is_discount: false,
            stock: 10,
            sales_count: 0,
            status: 1,
            image_url: None,
            created_at: Utc::now(),
        };
        assert_eq!(product.effective_price(), dec!(12.00));
        product.is_discount = true;
        assert_eq!(product.effective_price(), dec!(9.50));
        product.discount_price = None;
        assert_eq!(product.effective_price(), dec!(12.00));
    }

    #[test]
    fn line_total_stays_within_the_total_column() {
        assert_eq!(line_total(dec!(10.00), 3), Some(dec!(30.00)));
        assert_eq!(line_total(max_unit_price(), 100), Some(dec!(9999999999.00)));
        assert_eq!(line_total(max_unit_price(), 101), None);
        assert_eq!(line_total(Decimal::MAX, 2), None);
    }
}
