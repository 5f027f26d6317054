use std::sync::Arc;

use crate::{
    audit::AuditLog,
    payment::{PaymentGateway, SignatureVerifier},
    repository::{
        CategoryRepository, OrderRepository, ProductReferences, ProductRepository,
        TransactionManager, UserRepository,
    },
    services::{OrderService, PaymentService, ProductService},
};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub catalog: Arc<ProductService>,
}

/// Everything the payment service needs besides the store.
pub struct PaymentWiring {
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub notify_url: String,
    pub return_url: String,
}

impl AppState {
    /// Wires all services onto one store that implements every repository.
    pub fn from_store<S>(store: Arc<S>, audit: Arc<dyn AuditLog>, payment: PaymentWiring) -> Self
    where
        S: OrderRepository
            + ProductRepository
            + UserRepository
            + CategoryRepository
            + ProductReferences
            + TransactionManager
            + 'static,
    {
        let orders: Arc<dyn OrderRepository> = store.clone();
        let products: Arc<dyn ProductRepository> = store.clone();
        let users: Arc<dyn UserRepository> = store.clone();
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let references: Arc<dyn ProductReferences> = store.clone();
        let transactions: Arc<dyn TransactionManager> = store;

        Self {
            orders: Arc::new(OrderService::new(
                orders.clone(),
                products.clone(),
                users.clone(),
                transactions.clone(),
                audit.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                orders,
                products.clone(),
                payment.gateway,
                payment.verifier,
                payment.notify_url,
                payment.return_url,
                audit.clone(),
            )),
            catalog: Arc::new(ProductService::new(
                products,
                users,
                categories,
                references,
                transactions,
                audit,
            )),
        }
    }
}
