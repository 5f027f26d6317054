use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    audit::{AuditLog, log_audit},
    error::{AppError, AppResult},
    models::{OrderStatus, line_total},
    payment::{
        PaymentGateway, PaymentRequest, SignatureVerifier, TRADE_SUCCESS, sign_check_content,
    },
    repository::{OrderRepository, ProductRepository},
};

/// What a gateway notification did. Only `Rejected` asks the gateway to
/// deliver again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Applied(i64),
    AlreadyPaid(i64),
    Skipped,
    Rejected,
}

impl NotifyOutcome {
    pub fn acknowledged(self) -> bool {
        !matches!(self, NotifyOutcome::Rejected)
    }

    /// Plain-text body the gateway expects back.
    pub fn reply(self) -> &'static str {
        if self.acknowledged() { "success" } else { "failure" }
    }
}

pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: Arc<dyn SignatureVerifier>,
    notify_url: String,
    return_url: String,
    audit: Arc<dyn AuditLog>,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: Arc<dyn SignatureVerifier>,
        notify_url: String,
        return_url: String,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            orders,
            products,
            gateway,
            verifier,
            notify_url,
            return_url,
            audit,
        }
    }

    /// Builds the auto-submitting gateway form for an order. A form that
    /// cannot be generated yields an empty body.
    pub async fn create_payment(&self, order_id: i64) -> AppResult<String> {
        let order = match self.orders.get(order_id).await? {
            Some(o) => o,
            None => return Err(AppError::not_found("Order")),
        };
        let product = match self.products.get(order.product_id).await? {
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

        let Some(total_amount) = line_total(product.price, order.quantity) else {
            return Err(AppError::BadRequest(format!(
                "payment amount for order {order_id} is out of range"
            )));
        };

        let request = PaymentRequest {
            out_trade_no: order.id.to_string(),
            total_amount,
            subject: product.name.clone(),
            notify_url: self.notify_url.clone(),
            return_url: self.return_url.clone(),
        };

        match self.gateway.create_payment_form(&request) {
            Ok(form) => {
                tracing::info!(order_id, amount = %request.total_amount, "payment form issued");
                Ok(form)
            }
            Err(err) => {
                tracing::error!(order_id, error = %err, "payment form generation failed");
                Ok(String::new())
            }
        }
    }

    /// Reconciles an asynchronous gateway notification. Never fails: every
    /// problem collapses into [`NotifyOutcome::Rejected`].
    pub async fn handle_notify(&self, params: BTreeMap<String, String>) -> NotifyOutcome {
        let signature = params.get("sign").map(String::as_str).unwrap_or_default();
        if !self.verifier.verify(&sign_check_content(&params), signature) {
            tracing::warn!(
                out_trade_no = params.get("out_trade_no").map(String::as_str).unwrap_or("-"),
                error = %AppError::SignatureInvalid,
                "payment notification rejected"
            );
            return NotifyOutcome::Rejected;
        }

        let trade_status = params.get("trade_status").map(String::as_str);
        if trade_status != Some(TRADE_SUCCESS) {
            tracing::info!(trade_status = ?trade_status, "payment notification skipped");
            return NotifyOutcome::Skipped;
        }

        let Some(order_id) = params
            .get("out_trade_no")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
        else {
            tracing::warn!("payment notification carries no usable out_trade_no");
            return NotifyOutcome::Rejected;
        };

        match self.apply_trade_success(order_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(order_id, error = %err, "payment notification not applied");
                NotifyOutcome::Rejected
            }
        }
    }

    // Two sequential writes without a transaction; a lost order write leaves
    // the stock already moved.
    async fn apply_trade_success(&self, order_id: i64) -> AppResult<NotifyOutcome> {
        let mut order = match self.orders.get(order_id).await? {
            Some(o) => o,
            None => return Err(AppError::not_found("Order")),
        };
        if order.status >= OrderStatus::PAID {
            tracing::info!(order_id, "duplicate payment notification acknowledged");
            return Ok(NotifyOutcome::AlreadyPaid(order_id));
        }

        let mut product = match self.products.get(order.product_id).await? {
            Some(p) => p,
            None => return Err(AppError::not_found("Product")),
        };
        product.sales_count += order.quantity;
        product.stock -= order.quantity;
        if self.products.update(&product).await? == 0 {
            return Err(AppError::Persistence(format!(
                "stock update for product {}",
                product.id
            )));
        }

        order.status = OrderStatus::PAID;
        if self.orders.update(&order).await? == 0 {
            return Err(AppError::Persistence(format!("mark order {order_id} paid")));
        }

        tracing::info!(order_id, product_id = product.id, "payment confirmed");
        if let Err(err) = log_audit(
            self.audit.as_ref(),
            Some(order.user_id),
            "order_paid_notify",
            Some("orders"),
            Some(serde_json::json!({ "order_id": order_id })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(NotifyOutcome::Applied(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejection_asks_for_redelivery() {
        assert_eq!(NotifyOutcome::Applied(1).reply(), "success");
        assert_eq!(NotifyOutcome::AlreadyPaid(1).reply(), "success");
        assert_eq!(NotifyOutcome::Skipped.reply(), "success");
        assert_eq!(NotifyOutcome::Rejected.reply(), "failure");
    }
}
