use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use crate::{
    audit::{AuditEntry, AuditLog},
    error::{AppError, AppResult},
    models::{Category, NewOrder, NewProduct, Order, Product, ProductReference, User},
    repository::{
        CategoryRepository, OrderFilter, OrderRepository, Page, PageRequest, ProductFilter,
        ProductReferences, ProductRepository, ProductSort, TransactionManager, UnitOfWork,
        UserRepository,
    },
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    /// Product ids of dependent rows that live outside the order table.
    references: HashMap<ProductReference, Vec<i64>>,
    audit: Vec<AuditEntry>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn write_order(&mut self, faults: &Faults, order: &Order) -> u64 {
        if faults.order_writes.load(Ordering::SeqCst) {
            return 0;
        }
        match self.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = Order {
                    updated_at: Utc::now(),
                    ..order.clone()
                };
                1
            }
            None => 0,
        }
    }

    fn write_product(&mut self, faults: &Faults, product: &Product) -> u64 {
        if faults.product_writes.load(Ordering::SeqCst) {
            return 0;
        }
        match self.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                1
            }
            None => 0,
        }
    }
}

/// Switches that make writes report zero affected rows.
#[derive(Debug, Default)]
struct Faults {
    order_writes: AtomicBool,
    product_writes: AtomicBool,
}

/// A thread-safe in-process store implementing every repository contract.
///
/// All tables live behind one `Arc<RwLock<..>>`. A unit of work takes the
/// write lock for its whole lifetime and stages changes on a copy, so
/// transactions serialize and an uncommitted unit of work leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str, role: &str) -> User {
        let mut tables = self.tables.write().await;
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            name: None,
            phone: None,
            role: role.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_category(&self, name: &str) -> Category {
        let mut tables = self.tables.write().await;
        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        category
    }

    /// Records a dependent row (cart item, review, ...) pointing at `product_id`.
    /// Order references come from the order table itself.
    pub async fn add_reference(&self, relation: ProductReference, product_id: i64) {
        let mut tables = self.tables.write().await;
        tables
            .references
            .entry(relation)
            .or_default()
            .push(product_id);
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.tables.read().await.audit.clone()
    }

    /// Makes order inserts fail and order updates report zero rows.
    pub fn fail_order_writes(&self, fail: bool) {
        self.faults.order_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes product updates report zero rows.
    pub fn fail_product_writes(&self, fail: bool) {
        self.faults.product_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn insert(&self, order: NewOrder) -> AppResult<Order> {
        if self.faults.order_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("order insert affected no rows".into()));
        }
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let order = Order {
            id: tables.next_id(),
            user_id: order.user_id,
            product_id: order.product_id,
            quantity: order.quantity,
            price: order.price,
            total_price: order.total_price,
            status: order.status,
            last_status: None,
            refund_status: order.refund_status,
            refund_reason: None,
            recv_address: order.recv_address,
            recv_phone: order.recv_phone,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update(&self, order: &Order) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.write_order(&self.faults, order))
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.remove(&id).map_or(0, |_| 1))
    }

    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let removed = ids
            .iter()
            .filter(|id| tables.orders.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn page(&self, filter: &OrderFilter, request: PageRequest) -> AppResult<Page<Order>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(slice_page(matching, request))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        let mut tables = self.tables.write().await;
        let product = Product {
            id: tables.next_id(),
            farmer_id: product.farmer_id,
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price: product.price,
            discount_price: product.discount_price,
            is_discount: product.is_discount,
            stock: product.stock,
            sales_count: 0,
            status: product.status,
            image_url: product.image_url,
            created_at: Utc::now(),
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, product: &Product) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.write_product(&self.faults, product))
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.remove(&id).map_or(0, |_| 1))
    }

    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let removed = ids
            .iter()
            .filter(|id| tables.products.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn ids_by_farmer(&self, farmer_id: i64) -> AppResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|product| product.farmer_id == farmer_id)
            .map(|product| product.id)
            .collect())
    }

    async fn page(
        &self,
        filter: &ProductFilter,
        request: PageRequest,
    ) -> AppResult<Page<Product>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Product> = tables
            .products
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        match filter.sort {
            ProductSort::CreatedAtDesc => {
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            ProductSort::Sales { ascending } => {
                matching.sort_by_key(|product| product.sales_count);
                if !ascending {
                    matching.reverse();
                }
            }
            ProductSort::EffectivePrice { ascending } => {
                matching.sort_by_key(|product| product.effective_price());
                if !ascending {
                    matching.reverse();
                }
            }
        }
        Ok(slice_page(matching, request))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }
}

#[async_trait]
impl ProductReferences for InMemoryStore {
    async fn count(&self, relation: ProductReference, product_id: i64) -> AppResult<u64> {
        let tables = self.tables.read().await;
        let count = match relation {
            ProductReference::Order => tables
                .orders
                .values()
                .filter(|order| order.product_id == product_id)
                .count(),
            other => tables
                .references
                .get(&other)
                .map_or(0, |ids| ids.iter().filter(|id| **id == product_id).count()),
        };
        Ok(count as u64)
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }
}

#[async_trait]
impl TransactionManager for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().write_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            staged: Mutex::new(staged),
            faults: self.faults.clone(),
        }))
    }
}

pub struct InMemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Mutex<Tables>,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn get_order(&self, id: i64) -> AppResult<Option<Order>> {
        Ok(self.staged.lock().await.orders.get(&id).cloned())
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        Ok(self.staged.lock().await.products.get(&id).cloned())
    }

    async fn update_order(&self, order: &Order) -> AppResult<u64> {
        Ok(self.staged.lock().await.write_order(&self.faults, order))
    }

    async fn update_product(&self, product: &Product) -> AppResult<u64> {
        Ok(self.staged.lock().await.write_product(&self.faults, product))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryUnitOfWork {
            mut guard, staged, ..
        } = *self;
        *guard = staged.into_inner();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

fn slice_page<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.size as usize)
        .collect();
    Page {
        items,
        total,
        page: request.page,
        size: request.size,
    }
}
