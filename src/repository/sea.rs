use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, Order as Direction, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::{
    entity::{
        carousel_items, cart_items,
        categories::{Entity as Categories, Model as CategoryModel},
        favorites,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        reviews,
        users::{Entity as Users, Model as UserModel},
        CarouselItems, CartItems, Favorites, Reviews,
    },
    error::AppResult,
    models::{
        Category, NewOrder, NewProduct, Order, OrderStatus, Product, ProductReference,
        RefundStatus, User,
    },
    repository::{
        CategoryRepository, OrderFilter, OrderRepository, Page, PageRequest, ProductFilter,
        ProductReferences, ProductRepository, ProductSort, TransactionManager, UnitOfWork,
        UserRepository,
    },
};

const EFFECTIVE_PRICE_SQL: &str =
    "CASE WHEN is_discount AND discount_price IS NOT NULL THEN discount_price ELSE price END";

/// PostgreSQL-backed store built on the sea-orm entities.
#[derive(Clone)]
pub struct SeaStore {
    conn: DatabaseConnection,
}

impl SeaStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderRepository for SeaStore {
    async fn get(&self, id: i64) -> AppResult<Option<Order>> {
        find_order(&self.conn, id, false).await
    }

    async fn insert(&self, order: NewOrder) -> AppResult<Order> {
        let model = OrderActive {
            id: NotSet,
            user_id: Set(order.user_id),
            product_id: Set(order.product_id),
            quantity: Set(order.quantity),
            price: Set(order.price),
            total_price: Set(order.total_price),
            status: Set(order.status.0),
            last_status: Set(None),
            refund_status: Set(order.refund_status.0),
            refund_reason: Set(None),
            recv_address: Set(order.recv_address),
            recv_phone: Set(order.recv_phone),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(order_from_entity(model))
    }

    async fn update(&self, order: &Order) -> AppResult<u64> {
        save_order(&self.conn, order).await
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let result = Orders::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected)
    }

    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64> {
        let result = Orders::delete_many()
            .filter(OrderCol::Id.is_in(ids.to_vec()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Order>> {
        let orders = Orders::find()
            .filter(OrderCol::UserId.eq(user_id))
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect();
        Ok(orders)
    }

    async fn page(&self, filter: &OrderFilter, request: PageRequest) -> AppResult<Page<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(id) = filter.id {
            condition = condition.add(OrderCol::Id.eq(id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.0));
        }
        if let Some(product_ids) = &filter.product_ids {
            condition = condition.add(OrderCol::ProductId.is_in(product_ids.clone()));
        }

        let finder = Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt);

        let total = finder.clone().count(&self.conn).await?;

        let items = finder
            .limit(request.size)
            .offset(request.offset())
            .all(&self.conn)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect();

        Ok(Page {
            items,
            total,
            page: request.page,
            size: request.size,
        })
    }
}

#[async_trait]
impl ProductRepository for SeaStore {
    async fn get(&self, id: i64) -> AppResult<Option<Product>> {
        find_product(&self.conn, id, false).await
    }

    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        let model = ProductActive {
            id: NotSet,
            farmer_id: Set(product.farmer_id),
            category_id: Set(product.category_id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            discount_price: Set(product.discount_price),
            is_discount: Set(product.is_discount),
            stock: Set(product.stock),
            sales_count: Set(0),
            status: Set(product.status),
            image_url: Set(product.image_url),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(product_from_entity(model))
    }

    async fn update(&self, product: &Product) -> AppResult<u64> {
        save_product(&self.conn, product).await
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let result = Products::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected)
    }

    async fn delete_batch(&self, ids: &[i64]) -> AppResult<u64> {
        let result = Products::delete_many()
            .filter(ProdCol::Id.is_in(ids.to_vec()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn ids_by_farmer(&self, farmer_id: i64) -> AppResult<Vec<i64>> {
        let ids = Products::find()
            .select_only()
            .column(ProdCol::Id)
            .filter(ProdCol::FarmerId.eq(farmer_id))
            .into_tuple::<i64>()
            .all(&self.conn)
            .await?;
        Ok(ids)
    }

    async fn page(
        &self,
        filter: &ProductFilter,
        request: PageRequest,
    ) -> AppResult<Page<Product>> {
        let mut condition = Condition::all();

        if let Some(name) = filter.name.as_ref().filter(|s| !s.is_empty()) {
            condition = condition.add(Expr::col(ProdCol::Name).ilike(format!("%{}%", name)));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(ProdCol::CategoryId.eq(category_id));
        }
        if let Some(farmer_id) = filter.farmer_id {
            condition = condition.add(ProdCol::FarmerId.eq(farmer_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(ProdCol::Status.eq(status));
        }

        // Price bounds apply to whichever price the buyer actually pays.
        if filter.min_price.is_some() || filter.max_price.is_some() {
            let mut discounted = Condition::all()
                .add(ProdCol::IsDiscount.eq(true))
                .add(ProdCol::DiscountPrice.is_not_null());
            let mut regular = Condition::all().add(
                Condition::any()
                    .add(ProdCol::IsDiscount.eq(false))
                    .add(ProdCol::DiscountPrice.is_null()),
            );
            if let Some(min_price) = filter.min_price {
                discounted = discounted.add(ProdCol::DiscountPrice.gte(min_price));
                regular = regular.add(ProdCol::Price.gte(min_price));
            }
            if let Some(max_price) = filter.max_price {
                discounted = discounted.add(ProdCol::DiscountPrice.lte(max_price));
                regular = regular.add(ProdCol::Price.lte(max_price));
            }
            condition = condition.add(Condition::any().add(discounted).add(regular));
        }

        let mut finder = Products::find().filter(condition);
        finder = match filter.sort {
            ProductSort::CreatedAtDesc => finder.order_by_desc(ProdCol::CreatedAt),
            ProductSort::Sales { ascending } => {
                finder.order_by(ProdCol::SalesCount, direction(ascending))
            }
            ProductSort::EffectivePrice { ascending } => finder.order_by(
                SimpleExpr::Custom(EFFECTIVE_PRICE_SQL.to_owned()),
                direction(ascending),
            ),
        };

        let total = finder.clone().count(&self.conn).await?;

        let items = finder
            .limit(request.size)
            .offset(request.offset())
            .all(&self.conn)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();

        Ok(Page {
            items,
            total,
            page: request.page,
            size: request.size,
        })
    }
}

#[async_trait]
impl UserRepository for SeaStore {
    async fn get(&self, id: i64) -> AppResult<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(user_from_entity);
        Ok(user)
    }
}

#[async_trait]
impl CategoryRepository for SeaStore {
    async fn get(&self, id: i64) -> AppResult<Option<Category>> {
        let category = Categories::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(category_from_entity);
        Ok(category)
    }
}

#[async_trait]
impl ProductReferences for SeaStore {
    async fn count(&self, relation: ProductReference, product_id: i64) -> AppResult<u64> {
        let count = match relation {
            ProductReference::CarouselItem => {
                CarouselItems::find()
                    .filter(carousel_items::Column::ProductId.eq(product_id))
                    .count(&self.conn)
                    .await?
            }
            ProductReference::Order => {
                Orders::find()
                    .filter(OrderCol::ProductId.eq(product_id))
                    .count(&self.conn)
                    .await?
            }
            ProductReference::Cart => {
                CartItems::find()
                    .filter(cart_items::Column::ProductId.eq(product_id))
                    .count(&self.conn)
                    .await?
            }
            ProductReference::Review => {
                Reviews::find()
                    .filter(reviews::Column::ProductId.eq(product_id))
                    .count(&self.conn)
                    .await?
            }
            ProductReference::Favorite => {
                Favorites::find()
                    .filter(favorites::Column::ProductId.eq(product_id))
                    .count(&self.conn)
                    .await?
            }
        };
        Ok(count)
    }
}

#[async_trait]
impl TransactionManager for SeaStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let txn = self.conn.begin().await?;
        Ok(Box::new(SeaUnitOfWork { txn }))
    }
}

/// Rows read through the unit of work are locked `FOR UPDATE` until it ends.
/// sea-orm rolls the transaction back if it is dropped uncommitted.
pub struct SeaUnitOfWork {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UnitOfWork for SeaUnitOfWork {
    async fn get_order(&self, id: i64) -> AppResult<Option<Order>> {
        find_order(&self.txn, id, true).await
    }

    async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        find_product(&self.txn, id, true).await
    }

    async fn update_order(&self, order: &Order) -> AppResult<u64> {
        save_order(&self.txn, order).await
    }

    async fn update_product(&self, product: &Product) -> AppResult<u64> {
        save_product(&self.txn, product).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    for_update: bool,
) -> AppResult<Option<Order>> {
    let mut finder = Orders::find_by_id(id);
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.one(conn).await?.map(order_from_entity))
}

async fn find_product<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    for_update: bool,
) -> AppResult<Option<Product>> {
    let mut finder = Products::find_by_id(id);
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.one(conn).await?.map(product_from_entity))
}

async fn save_order<C: ConnectionTrait>(conn: &C, order: &Order) -> AppResult<u64> {
    let changes = OrderActive {
        id: NotSet,
        user_id: Set(order.user_id),
        product_id: Set(order.product_id),
        quantity: Set(order.quantity),
        price: Set(order.price),
        total_price: Set(order.total_price),
        status: Set(order.status.0),
        last_status: Set(order.last_status.map(|status| status.0)),
        refund_status: Set(order.refund_status.0),
        refund_reason: Set(order.refund_reason.clone()),
        recv_address: Set(order.recv_address.clone()),
        recv_phone: Set(order.recv_phone.clone()),
        created_at: Set(order.created_at.into()),
        updated_at: Set(Utc::now().into()),
    };
    let result = Orders::update_many()
        .set(changes)
        .filter(OrderCol::Id.eq(order.id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn save_product<C: ConnectionTrait>(conn: &C, product: &Product) -> AppResult<u64> {
    let changes = ProductActive {
        id: NotSet,
        farmer_id: Set(product.farmer_id),
        category_id: Set(product.category_id),
        name: Set(product.name.clone()),
        description: Set(product.description.clone()),
        price: Set(product.price),
        discount_price: Set(product.discount_price),
        is_discount: Set(product.is_discount),
        stock: Set(product.stock),
        sales_count: Set(product.sales_count),
        status: Set(product.status),
        image_url: Set(product.image_url.clone()),
        created_at: Set(product.created_at.into()),
    };
    let result = Products::update_many()
        .set(changes)
        .filter(ProdCol::Id.eq(product.id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

fn direction(ascending: bool) -> Direction {
    if ascending { Direction::Asc } else { Direction::Desc }
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        total_price: model.total_price,
        status: OrderStatus(model.status),
        last_status: model.last_status.map(OrderStatus),
        refund_status: RefundStatus(model.refund_status),
        refund_reason: model.refund_reason,
        recv_address: model.recv_address,
        recv_phone: model.recv_phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        farmer_id: model.farmer_id,
        category_id: model.category_id,
        name: model.name,
        description: model.description,
        price: model.price,
        discount_price: model.discount_price,
        is_discount: model.is_discount,
        stock: model.stock,
        sales_count: model.sales_count,
        status: model.status,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        name: model.name,
        phone: model.phone,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
