use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::payment::{
    PRODUCT_CODE,
    signature::{HmacSha256Signer, SIGN_TYPE, sign_check_content},
};

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub out_trade_no: String,
    pub total_amount: Decimal,
    pub subject: String,
    pub notify_url: String,
    pub return_url: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to encode biz content: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
}

pub trait PaymentGateway: Send + Sync {
    /// Returns an HTML document that forwards the buyer to the cashier page.
    fn create_payment_form(&self, request: &PaymentRequest) -> Result<String, GatewayError>;
}

/// Builds signed `alipay.trade.page.pay` forms.
pub struct PagePayGateway {
    gateway_url: String,
    app_id: String,
    signer: HmacSha256Signer,
}

impl PagePayGateway {
    pub fn new(gateway_url: String, app_id: String, signer: HmacSha256Signer) -> Self {
        Self {
            gateway_url,
            app_id,
            signer,
        }
    }

    fn signed_params(
        &self,
        request: &PaymentRequest,
    ) -> Result<BTreeMap<String, String>, GatewayError> {
        let biz_content = serde_json::json!({
            "out_trade_no": request.out_trade_no,
            "total_amount": format!("{:.2}", request.total_amount),
            "subject": request.subject,
            "product_code": PRODUCT_CODE,
        });

        let mut params = BTreeMap::new();
        params.insert("app_id".to_string(), self.app_id.clone());
        params.insert("method".to_string(), "alipay.trade.page.pay".to_string());
        params.insert("format".to_string(), "JSON".to_string());
        params.insert("charset".to_string(), "utf-8".to_string());
        params.insert("sign_type".to_string(), SIGN_TYPE.to_string());
        params.insert(
            "timestamp".to_string(),
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        params.insert("version".to_string(), "1.0".to_string());
        params.insert("notify_url".to_string(), request.notify_url.clone());
        params.insert("return_url".to_string(), request.return_url.clone());
        params.insert("biz_content".to_string(), serde_json::to_string(&biz_content)?);

        let sign = self.signer.sign(&sign_check_content(&params));
        params.insert("sign".to_string(), sign);
        Ok(params)
    }
}

impl PaymentGateway for PagePayGateway {
    fn create_payment_form(&self, request: &PaymentRequest) -> Result<String, GatewayError> {
        if request.total_amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidRequest(format!(
                "total amount must be positive, got {}",
                request.total_amount
            )));
        }

        let params = self.signed_params(request)?;
        let inputs: String = params
            .iter()
            .map(|(name, value)| {
                format!(
                    "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                    escape_html(name),
                    escape_html(value)
                )
            })
            .collect();

        Ok(format!(
            "<form name=\"punchout_form\" method=\"post\" action=\"{}?charset=utf-8\">\n{}\
             <input type=\"submit\" value=\"Pay\" style=\"display:none\">\n</form>\n\
             <script>document.forms[0].submit();</script>",
            escape_html(&self.gateway_url),
            inputs
        ))
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::SignatureVerifier;
    use rust_decimal_macros::dec;

    fn gateway() -> PagePayGateway {
        PagePayGateway::new(
            "https://gateway.example/gateway.do".into(),
            "2021000000000000".into(),
            HmacSha256Signer::new(b"merchant-key").unwrap(),
        )
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            out_trade_no: "42".into(),
            total_amount: dec!(30),
            subject: "Heirloom \"Tomatoes\"".into(),
            notify_url: "https://market.example/api/alipay/notify".into(),
            return_url: "http://localhost:8080/orders".into(),
        }
    }

    #[test]
    fn signed_params_verify_with_the_same_key() {
        let gateway = gateway();
        let params = gateway.signed_params(&request()).unwrap();

        let biz: serde_json::Value = serde_json::from_str(&params["biz_content"]).unwrap();
        assert_eq!(biz["out_trade_no"], "42");
        assert_eq!(biz["total_amount"], "30.00");
        assert_eq!(biz["product_code"], PRODUCT_CODE);

        let verifier = HmacSha256Signer::new(b"merchant-key").unwrap();
        assert!(verifier.verify(&sign_check_content(&params), &params["sign"]));
    }

    #[test]
    fn form_escapes_values_and_posts_to_gateway() {
        let form = gateway().create_payment_form(&request()).unwrap();
        assert!(form.contains("action=\"https://gateway.example/gateway.do?charset=utf-8\""));
        assert!(form.contains("name=\"method\" value=\"alipay.trade.page.pay\""));
        assert!(form.contains("Heirloom \\&quot;Tomatoes\\&quot;"));
        assert!(!form.contains("\"Tomatoes\""));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut request = request();
        request.total_amount = Decimal::ZERO;
        assert!(matches!(
            gateway().create_payment_form(&request),
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
