use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    audit::{AuditLog, log_audit},
    dto::orders::{
        BatchDeleteResult, CreateOrderRequest, OrderDetail, OrderList, UpdateOrderRequest,
    },
    error::{AppError, AppResult},
    models::{NewOrder, Order, OrderStatus, RefundStatus, line_total, max_unit_price},
    repository::{
        OrderRepository, Page, ProductRepository, TransactionManager, UnitOfWork, UserRepository,
    },
    response::{ApiResponse, Meta},
    routes::params::OrderPageQuery,
};

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    users: Arc<dyn UserRepository>,
    transactions: Arc<dyn TransactionManager>,
    audit: Arc<dyn AuditLog>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserRepository>,
        transactions: Arc<dyn TransactionManager>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            transactions,
            audit,
        }
    }

    pub async fn create_order(&self, payload: CreateOrderRequest) -> AppResult<ApiResponse<Order>> {
        if payload.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if payload.price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }
        if payload.price > max_unit_price() {
            return Err(AppError::BadRequest(format!(
                "price must not exceed {}",
                max_unit_price()
            )));
        }
        let Some(total_price) = line_total(payload.price, payload.quantity) else {
            return Err(AppError::BadRequest("order total is out of range".to_string()));
        };

        let mut product = match self.products.get(payload.product_id).await? {
            Some(p) => p,
            None => return Err(AppError::not_found("Product")),
        };
        if product.stock < payload.quantity {
            return Err(AppError::InsufficientStock {
                product_id: product.id,
                available: product.stock,
                requested: payload.quantity,
            });
        }

        let order = self
            .orders
            .insert(NewOrder {
                user_id: payload.user_id,
                product_id: payload.product_id,
                quantity: payload.quantity,
                price: payload.price,
                total_price,
                status: OrderStatus::CREATED,
                refund_status: RefundStatus::NONE,
                recv_address: payload.recv_address,
                recv_phone: payload.recv_phone,
            })
            .await?;

        // Not transactional: the order stays even if the stock write is lost.
        product.stock -= order.quantity;
        if self.products.update(&product).await? == 0 {
            tracing::warn!(
                order_id = order.id,
                product_id = product.id,
                "stock decrement affected no rows"
            );
        }

        tracing::info!(order_id = order.id, product_id = product.id, "order created");
        self.audit(Some(order.user_id), "order_create", order.id).await;

        Ok(ApiResponse::success(
            "Order created",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn update_order_status(
        &self,
        id: i64,
        status: i32,
    ) -> AppResult<ApiResponse<Order>> {
        if status < 0 {
            return Err(AppError::BadRequest(format!("invalid order status {status}")));
        }
        let mut order = self.find_order(id).await?;

        order.last_status = Some(order.status);
        order.status = OrderStatus(status);
        self.save(&order, "update order status").await?;

        tracing::info!(order_id = id, status, "order status updated");
        self.audit(None, "order_status_update", id).await;

        Ok(ApiResponse::success(
            "Status updated",
            order,
            Some(Meta::empty()),
        ))
    }

    /// Marks the order paid and moves its quantity from stock to sales, all
    /// inside one unit of work.
    pub async fn pay_order(&self, id: i64) -> AppResult<ApiResponse<Order>> {
        let uow = self.transactions.begin().await?;
        let result = apply_payment(uow.as_ref(), id).await;
        match result {
            Ok(order) => {
                uow.commit().await?;
                tracing::info!(order_id = id, "order paid");
                self.audit(Some(order.user_id), "order_paid", id).await;
                Ok(ApiResponse::success(
                    "Payment recorded",
                    order,
                    Some(Meta::empty()),
                ))
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(order_id = id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub async fn refund_order(&self, id: i64, reason: String) -> AppResult<ApiResponse<Order>> {
        let mut order = self.find_order(id).await?;

        if !order.status.is_refundable() {
            return Err(AppError::InvalidState(format!(
                "order status {} does not allow a refund",
                order.status.0
            )));
        }

        order.refund_status = RefundStatus::REQUESTED;
        order.refund_reason = Some(reason);
        self.save(&order, "request refund").await?;

        tracing::info!(order_id = id, "refund requested");
        self.audit(Some(order.user_id), "order_refund_request", id).await;

        Ok(ApiResponse::success(
            "Refund requested",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn update_order_address(
        &self,
        id: i64,
        address: String,
        phone: String,
    ) -> AppResult<ApiResponse<Order>> {
        let mut order = self.find_order(id).await?;

        if order.status.is_shipped() {
            return Err(AppError::InvalidState(
                "order already shipped, the delivery address can no longer change".to_string(),
            ));
        }

        order.recv_address = Some(address);
        order.recv_phone = Some(phone);
        self.save(&order, "update delivery address").await?;

        tracing::info!(order_id = id, "delivery address updated");

        Ok(ApiResponse::success(
            "Address updated",
            order,
            Some(Meta::empty()),
        ))
    }

    pub async fn update_order(
        &self,
        id: i64,
        patch: UpdateOrderRequest,
    ) -> AppResult<ApiResponse<Order>> {
        if patch.quantity.is_some_and(|quantity| quantity <= 0) {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if let Some(status) = patch.status.filter(|status| *status < 0) {
            return Err(AppError::BadRequest(format!("invalid order status {status}")));
        }
        if let Some(price) = patch.price {
            if price < Decimal::ZERO || price > max_unit_price() {
                return Err(AppError::BadRequest(format!("price {price} is out of range")));
            }
        }
        let existing = self.find_order(id).await?;

        let mut order = existing.clone();
        if let Some(quantity) = patch.quantity {
            order.quantity = quantity;
        }
        if let Some(price) = patch.price {
            order.price = price;
        }
        if let Some(status) = patch.status {
            order.status = OrderStatus(status);
        }
        if let Some(refund_status) = patch.refund_status {
            order.refund_status = RefundStatus(refund_status);
        }
        if let Some(reason) = patch.refund_reason {
            order.refund_reason = Some(reason);
        }
        if let Some(address) = patch.recv_address {
            order.recv_address = Some(address);
        }
        if let Some(phone) = patch.recv_phone {
            order.recv_phone = Some(phone);
        }

        order.id = existing.id;
        order.created_at = existing.created_at;
        order.user_id = existing.user_id;
        order.product_id = existing.product_id;
        order.total_price = existing.total_price;

        self.save(&order, "update order").await?;
        tracing::info!(order_id = id, "order updated");

        Ok(ApiResponse::success("Updated", order, Some(Meta::empty())))
    }

    pub async fn delete_order(&self, id: i64) -> AppResult<ApiResponse<serde_json::Value>> {
        if self.orders.delete(id).await? == 0 {
            return Err(AppError::Persistence(format!("delete order {id}")));
        }

        tracing::info!(order_id = id, "order deleted");
        self.audit(None, "order_delete", id).await;

        Ok(ApiResponse::success(
            "Deleted",
            serde_json::json!({}),
            Some(Meta::empty()),
        ))
    }

    pub async fn delete_batch(&self, ids: Vec<i64>) -> AppResult<ApiResponse<BatchDeleteResult>> {
        if ids.is_empty() {
            return Err(AppError::BadRequest("ids must not be empty".to_string()));
        }

        let deleted = self.orders.delete_batch(&ids).await?;
        if deleted == 0 {
            return Err(AppError::Persistence("batch delete orders".to_string()));
        }

        tracing::info!(deleted, "orders deleted");
        if let Err(err) = log_audit(
            self.audit.as_ref(),
            None,
            "order_batch_delete",
            Some("orders"),
            Some(serde_json::json!({ "order_ids": ids })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(ApiResponse::success(
            "Deleted",
            BatchDeleteResult { deleted },
            Some(Meta::empty()),
        ))
    }

    pub async fn get_order(&self, id: i64) -> AppResult<ApiResponse<OrderDetail>> {
        let order = self.find_order(id).await?;
        let detail = self.enrich(order).await?;
        Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
    }

    pub async fn get_orders_by_user(&self, user_id: i64) -> AppResult<ApiResponse<OrderList>> {
        let orders = self.orders.list_by_user(user_id).await?;
        if orders.is_empty() {
            return Err(AppError::not_found(format!("Orders for user {user_id}")));
        }

        let mut items = Vec::with_capacity(orders.len());
        for order in orders {
            items.push(self.enrich(order).await?);
        }

        let total = items.len() as u64;
        let page = Page {
            items,
            total,
            page: 1,
            size: total,
        };
        let meta = Meta::for_page(&page);
        Ok(ApiResponse::success(
            "Ok",
            OrderList { items: page.items },
            Some(meta),
        ))
    }

    pub async fn get_orders_by_page(
        &self,
        query: OrderPageQuery,
    ) -> AppResult<ApiResponse<OrderList>> {
        let request = query.page_request();
        let mut filter = query.base_filter();

        if let Some(farmer_id) = query.farmer_id {
            let product_ids = self.products.ids_by_farmer(farmer_id).await?;
            if product_ids.is_empty() {
                return Ok(page_response(Page::empty(request)));
            }
            filter.product_ids = Some(product_ids);
        }

        let page = self.orders.page(&filter, request).await?;
        let mut items = Vec::with_capacity(page.items.len());
        for order in page.items.iter().cloned() {
            items.push(self.enrich(order).await?);
        }

        Ok(page_response(page.map_items(items)))
    }

    async fn find_order(&self, id: i64) -> AppResult<Order> {
        match self.orders.get(id).await? {
            Some(o) => Ok(o),
            None => Err(AppError::not_found("Order")),
        }
    }

    async fn save(&self, order: &Order, action: &str) -> AppResult<()> {
        if self.orders.update(order).await? == 0 {
            return Err(AppError::Persistence(format!("{action} for order {}", order.id)));
        }
        Ok(())
    }

    /// Attaches buyer, product and farmer. A product that no longer exists
    /// leaves both product and farmer empty.
    async fn enrich(&self, order: Order) -> AppResult<OrderDetail> {
        let user = self.users.get(order.user_id).await?;
        let product = self.products.get(order.product_id).await?;
        let farmer = match &product {
            Some(product) => self.users.get(product.farmer_id).await?,
            None => None,
        };
        Ok(OrderDetail {
            order,
            user,
            product,
            farmer,
        })
    }

    async fn audit(&self, user_id: Option<i64>, action: &str, order_id: i64) {
        if let Err(err) = log_audit(
            self.audit.as_ref(),
            user_id,
            action,
            Some("orders"),
            Some(serde_json::json!({ "order_id": order_id })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }
}

async fn apply_payment(uow: &dyn UnitOfWork, id: i64) -> AppResult<Order> {
    let mut order = match uow.get_order(id).await? {
        Some(o) => o,
        None => return Err(AppError::not_found("Order")),
    };
    if order.status != OrderStatus::CREATED {
        return Err(AppError::InvalidState("order already paid".to_string()));
    }

    let mut product = match uow.get_product(order.product_id).await? {
        Some(p) => p,
        None => return Err(AppError::not_found("Product")),
    };
    if product.stock < order.quantity {
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            available: product.stock,
            requested: order.quantity,
        });
    }

    product.sales_count += order.quantity;
    product.stock -= order.quantity;
    if uow.update_product(&product).await? == 0 {
        return Err(AppError::Persistence("payment processing failed".to_string()));
    }

    order.status = OrderStatus::PAID;
    order.updated_at = Utc::now();
    if uow.update_order(&order).await? == 0 {
        return Err(AppError::Persistence("payment processing failed".to_string()));
    }

    Ok(order)
}

fn page_response(page: Page<OrderDetail>) -> ApiResponse<OrderList> {
    let meta = Meta::for_page(&page);
    ApiResponse::success("Orders", OrderList { items: page.items }, Some(meta))
}
