use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    audit::{AuditLog, log_audit},
    dto::{
        orders::BatchDeleteResult,
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    },
    error::{AppError, AppResult},
    models::{NewProduct, Product, ProductReference, max_unit_price},
    repository::{
        CategoryRepository, ProductReferences, ProductRepository, TransactionManager, UnitOfWork,
        UserRepository,
    },
    response::{ApiResponse, Meta},
    routes::params::ProductPageQuery,
};

const ON_SALE: i32 = 1;

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    references: Arc<dyn ProductReferences>,
    transactions: Arc<dyn TransactionManager>,
    audit: Arc<dyn AuditLog>,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserRepository>,
        categories: Arc<dyn CategoryRepository>,
        references: Arc<dyn ProductReferences>,
        transactions: Arc<dyn TransactionManager>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            products,
            users,
            categories,
            references,
            transactions,
            audit,
        }
    }

    pub async fn create_product(
        &self,
        payload: CreateProductRequest,
    ) -> AppResult<ApiResponse<Product>> {
        if payload.stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".to_string()));
        }
        ensure_prices(payload.price, payload.discount_price)?;

        let product = self
            .products
            .insert(NewProduct {
                farmer_id: payload.farmer_id,
                category_id: payload.category_id,
                name: payload.name,
                description: payload.description,
                price: payload.price,
                discount_price: payload.discount_price,
                is_discount: payload.is_discount,
                stock: payload.stock,
                status: payload.status.unwrap_or(ON_SALE),
                image_url: payload.image_url,
            })
            .await?;

        tracing::info!(product_id = product.id, "product created");
        self.audit(Some(product.farmer_id), "product_create", product.id)
            .await;

        Ok(ApiResponse::success(
            "Product created",
            product,
            Some(Meta::empty()),
        ))
    }

    pub async fn update_product(
        &self,
        id: i64,
        payload: UpdateProductRequest,
    ) -> AppResult<ApiResponse<Product>> {
        let mut product = self.find_product(id).await?;

        if let Some(category_id) = payload.category_id {
            product.category_id = category_id;
        }
        if let Some(name) = payload.name {
            product.name = name;
        }
        if let Some(description) = payload.description {
            product.description = Some(description);
        }
        if let Some(price) = payload.price {
            product.price = price;
        }
        if let Some(discount_price) = payload.discount_price {
            product.discount_price = Some(discount_price);
        }
        if let Some(is_discount) = payload.is_discount {
            product.is_discount = is_discount;
        }
        if let Some(stock) = payload.stock {
            product.stock = stock;
        }
        if let Some(status) = payload.status {
            product.status = status;
        }
        if let Some(image_url) = payload.image_url {
            product.image_url = Some(image_url);
        }

        if product.stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".to_string()));
        }
        ensure_prices(product.price, product.discount_price)?;

        if self.products.update(&product).await? == 0 {
            return Err(AppError::Persistence(format!("update product {id}")));
        }

        tracing::info!(product_id = id, "product updated");
        self.audit(Some(product.farmer_id), "product_update", id).await;

        Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
    }

    pub async fn get_product(&self, id: i64) -> AppResult<ApiResponse<ProductDetail>> {
        let product = self.find_product(id).await?;
        let detail = self.enrich(product).await?;
        Ok(ApiResponse::success("Product", detail, Some(Meta::empty())))
    }

    pub async fn get_products_by_page(
        &self,
        query: ProductPageQuery,
    ) -> AppResult<ApiResponse<ProductList>> {
        let request = query.page_request();
        let page = self.products.page(&query.filter(), request).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for product in page.items.iter().cloned() {
            items.push(self.enrich(product).await?);
        }

        let page = page.map_items(items);
        let meta = Meta::for_page(&page);
        Ok(ApiResponse::success(
            "Products",
            ProductList { items: page.items },
            Some(meta),
        ))
    }

    pub async fn update_product_status(
        &self,
        id: i64,
        status: i32,
    ) -> AppResult<ApiResponse<Product>> {
        let mut product = self.find_product(id).await?;
        product.status = status;
        if self.products.update(&product).await? == 0 {
            return Err(AppError::Persistence(format!("update status of product {id}")));
        }

        tracing::info!(product_id = id, status, "product status updated");

        Ok(ApiResponse::success(
            "Status updated",
            product,
            Some(Meta::empty()),
        ))
    }

    /// Sets the shelf status of every listed product in one unit of work.
    /// Nothing is written unless all ids resolve.
    pub async fn update_batch_status(
        &self,
        ids: Vec<i64>,
        status: i32,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        if status != 0 && status != ON_SALE {
            return Err(AppError::BadRequest(format!(
                "product status must be 0 or 1, got {status}"
            )));
        }
        if ids.is_empty() {
            return Err(AppError::BadRequest("ids must not be empty".to_string()));
        }

        let uow = self.transactions.begin().await?;
        let result = apply_status(uow.as_ref(), &ids, status).await;
        match result {
            Ok(updated) => {
                uow.commit().await?;
                tracing::info!(updated, status, "product statuses updated");
                Ok(ApiResponse::success(
                    "Status updated",
                    serde_json::json!({ "updated": updated }),
                    Some(Meta::empty()),
                ))
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub async fn delete_product(&self, id: i64) -> AppResult<ApiResponse<serde_json::Value>> {
        self.ensure_unreferenced(id).await?;

        if self.products.delete(id).await? == 0 {
            return Err(AppError::Persistence(format!("delete product {id}")));
        }

        tracing::info!(product_id = id, "product deleted");
        self.audit(None, "product_delete", id).await;

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
        for id in &ids {
            self.ensure_unreferenced(*id).await?;
        }

        let deleted = self.products.delete_batch(&ids).await?;
        if deleted == 0 {
            return Err(AppError::Persistence("batch delete products".to_string()));
        }

        tracing::info!(deleted, "products deleted");
        if let Err(err) = log_audit(
            self.audit.as_ref(),
            None,
            "product_batch_delete",
            Some("products"),
            Some(serde_json::json!({ "product_ids": ids })),
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

    /// Fails on the first dependent relation, checked in
    /// [`ProductReference::GUARD_ORDER`].
    async fn ensure_unreferenced(&self, product_id: i64) -> AppResult<()> {
        for relation in ProductReference::GUARD_ORDER {
            if self.references.count(relation, product_id).await? > 0 {
                tracing::warn!(product_id, %relation, "delete blocked by dependent rows");
                return Err(AppError::ReferentialConflict {
                    product_id,
                    relation,
                });
            }
        }
        Ok(())
    }

    async fn find_product(&self, id: i64) -> AppResult<Product> {
        match self.products.get(id).await? {
            Some(p) => Ok(p),
            None => Err(AppError::not_found("Product")),
        }
    }

    async fn enrich(&self, product: Product) -> AppResult<ProductDetail> {
        let farmer = self.users.get(product.farmer_id).await?;
        let category = self.categories.get(product.category_id).await?;
        Ok(ProductDetail {
            product,
            farmer,
            category,
        })
    }

    async fn audit(&self, user_id: Option<i64>, action: &str, product_id: i64) {
        if let Err(err) = log_audit(
            self.audit.as_ref(),
            user_id,
            action,
            Some("products"),
            Some(serde_json::json!({ "product_id": product_id })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }
}

async fn apply_status(uow: &dyn UnitOfWork, ids: &[i64], status: i32) -> AppResult<u64> {
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(product) = uow.get_product(*id).await? {
            found.push(product);
        }
    }
    if found.is_empty() {
        return Err(AppError::not_found("Products"));
    }
    if found.len() < ids.len() {
        return Err(AppError::not_found("Some products"));
    }

    let mut updated = 0;
    for mut product in found {
        product.status = status;
        if uow.update_product(&product).await? == 0 {
            return Err(AppError::Persistence(format!(
                "update status of product {}",
                product.id
            )));
        }
        updated += 1;
    }
    Ok(updated)
}

fn ensure_prices(price: Decimal, discount_price: Option<Decimal>) -> AppResult<()> {
    if price < Decimal::ZERO || discount_price.is_some_and(|d| d < Decimal::ZERO) {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }
    if price > max_unit_price() || discount_price.is_some_and(|d| d > max_unit_price()) {
        return Err(AppError::BadRequest(format!(
            "price must not exceed {}",
            max_unit_price()
        )));
    }
    Ok(())
}
