use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{
            BatchDeleteResult, BatchIdsRequest, CreateOrderRequest, OrderDetail, OrderList,
            RefundOrderRequest, UpdateAddressRequest, UpdateOrderRequest, UpdateOrderStatusRequest,
        },
        products::{
            BatchStatusRequest, CreateProductRequest, ProductDetail, ProductList,
            UpdateProductRequest, UpdateProductStatusRequest,
        },
    },
    models::{Category, Order, OrderStatus, Product, RefundStatus, User},
    response::{ApiResponse, Meta},
    routes::{health, orders, params, payments, products},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::list_user_orders,
        orders::update_order,
        orders::delete_order,
        orders::delete_orders,
        orders::update_order_status,
        orders::pay_order,
        orders::refund_order,
        orders::update_order_address,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::delete_products,
        products::update_product_status,
        products::update_batch_status,
        payments::pay_page,
        payments::notify
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderStatus,
            RefundStatus,
            CreateOrderRequest,
            UpdateOrderRequest,
            UpdateOrderStatusRequest,
            RefundOrderRequest,
            UpdateAddressRequest,
            BatchIdsRequest,
            BatchDeleteResult,
            OrderDetail,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateProductStatusRequest,
            BatchStatusRequest,
            ProductDetail,
            ProductList,
            params::SortOrder,
            params::ProductSortField,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<Product>,
            ApiResponse<ProductDetail>,
            ApiResponse<ProductList>,
            ApiResponse<BatchDeleteResult>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Payments", description = "Gateway payment form and notification"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_order_and_payment_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/order/{id}/pay"));
        assert!(doc.paths.paths.contains_key("/api/alipay/notify"));
        assert!(doc.paths.paths.contains_key("/api/product/batch/status"));
    }
}
