//! Hosted page-pay integration: signed payment forms out, signed notifications in.

pub mod gateway;
pub mod signature;

pub use gateway::{GatewayError, PagePayGateway, PaymentGateway, PaymentRequest};
pub use signature::{HmacSha256Signer, SignatureVerifier, sign_check_content};

pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";
pub const PRODUCT_CODE: &str = "FAST_INSTANT_TRADE_PAY";
