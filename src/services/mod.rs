pub mod order_service;
pub mod payment_service;
pub mod product_service;

pub use order_service::OrderService;
pub use payment_service::{NotifyOutcome, PaymentService};
pub use product_service::ProductService;
