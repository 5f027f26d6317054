//! Persistence contracts used by the services.
//!
//! Every service receives the repositories it needs as `Arc<dyn Trait>`, so the
//! same business logic runs against PostgreSQL ([`SeaStore`]) and the
//! in-process [`InMemoryStore`].

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{Category, NewOrder, NewProduct, Order, OrderStatus, Product, ProductReference, User},
};

pub mod in_memory;
pub mod sea;

pub use in_memory::InMemoryStore;
pub use sea::SeaStore;

const MAX_PAGE: u64 = i64::MAX as u64 / 100;

/// 1-based page selection. `page` is capped so the row offset always fits a
/// signed 64-bit SQL `OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            size: size.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: request.page,
            size: request.size,
        }
    }

    pub fn map_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

/// Filters for the order search; every `Some` is ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub product_ids: Option<Vec<i64>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|user_id| order.user_id == user_id)
            && self.id.is_none_or(|id| order.id == id)
            && self.status.is_none_or(|status| order.status == status)
            && self
                .product_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&order.product_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    CreatedAtDesc,
    Sales { ascending: bool },
    EffectivePrice { ascending: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub farmer_id: Option<i64>,
    pub status: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            name: None,
            category_id: None,
            farmer_id: None,
            status: None,
            min_price: None,
            max_price: None,
            sort: ProductSort::CreatedAtDesc,
        }
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.effective_price();
        self.name.as_ref().is_none_or(|name| {
            product
                .name
                .to_lowercase()
                .contains(&name.to_lowercase())
        }) && self.category_id.is_none_or(|id| product.category_id == id)
            && self.farmer_id.is_none_or(|id| product.farmer_id == id)
            && self.status.is_none_or(|status| product.status == status)
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Order>>;
    async fn insert(&self, order: NewOrder) -> AppResult<Order>;
    /// Returns the number of rows written.
    async fn update(&self, order: &Order) -> AppResult<u64>;
    async fn delete(&self, id: i64) -> AppResult<u64>;
    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64>;
    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Order>>;
    async fn page(&self, filter: &OrderFilter, request: PageRequest) -> AppResult<Page<Order>>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Product>>;
    async fn insert(&self, product: NewProduct) -> AppResult<Product>;
    async fn update(&self, product: &Product) -> AppResult<u64>;
    async fn delete(&self, id: i64) -> AppResult<u64>;
    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64>;
    async fn ids_by_farmer(&self, farmer_id: i64) -> AppResult<Vec<i64>>;
    async fn page(&self, filter: &ProductFilter, request: PageRequest)
    -> AppResult<Page<Product>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Category>>;
}

/// Counts rows in other tables that point at a product.
#[async_trait]
pub trait ProductReferences: Send + Sync {
    async fn count(&self, relation: ProductReference, product_id: i64) -> AppResult<u64>;
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// A scoped transaction. Writes become visible only on `commit`; dropping the
/// unit of work without committing discards them.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn get_order(&self, id: i64) -> AppResult<Option<Order>>;
    async fn get_product(&self, id: i64) -> AppResult<Option<Product>>;
    async fn update_order(&self, order: &Order) -> AppResult<u64>;
    async fn update_product(&self, product: &Product) -> AppResult<u64>;
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_size_and_page() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.size, 100);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(3, 10);
        assert_eq!(request.offset(), 20);

        let request = PageRequest::new(u64::MAX, 100);
        assert_eq!(request.page, MAX_PAGE);
        assert!(request.offset() <= i64::MAX as u64);
    }
}
