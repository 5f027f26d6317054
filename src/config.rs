use std::{env, fmt};

pub const DEFAULT_GATEWAY_URL: &str = "https://openapi-sandbox.dl.alipaydev.com/gateway.do";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:8080/orders";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payment: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let payment = PaymentConfig::from_env()?;
        Ok(Self {
            port,
            database_url,
            host,
            payment,
        })
    }
}

/// Merchant settings for the hosted page-pay gateway.
#[derive(Clone)]
pub struct PaymentConfig {
    pub gateway_url: String,
    pub app_id: String,
    pub sign_key: String,
    pub notify_url: String,
    pub return_url: String,
}

impl PaymentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let gateway_url =
            env::var("PAYMENT_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        let app_id = env::var("PAYMENT_APP_ID")
            .map_err(|_| anyhow::anyhow!("PAYMENT_APP_ID is not set"))?;
        let sign_key = env::var("PAYMENT_SIGN_KEY")
            .map_err(|_| anyhow::anyhow!("PAYMENT_SIGN_KEY is not set"))?;
        let notify_url = env::var("PAYMENT_NOTIFY_URL")
            .map_err(|_| anyhow::anyhow!("PAYMENT_NOTIFY_URL is not set"))?;
        let return_url =
            env::var("PAYMENT_RETURN_URL").unwrap_or_else(|_| DEFAULT_RETURN_URL.to_string());
        Ok(Self {
            gateway_url,
            app_id,
            sign_key,
            notify_url,
            return_url,
        })
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("gateway_url", &self.gateway_url)
            .field("app_id", &self.app_id)
            .field("sign_key", &"****")
            .field("notify_url", &self.notify_url)
            .field("return_url", &self.return_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_sign_key() {
        let config = PaymentConfig {
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            app_id: "2021000000000000".into(),
            sign_key: "super-secret".into(),
            notify_url: "https://market.example/api/alipay/notify".into(),
            return_url: DEFAULT_RETURN_URL.into(),
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("2021000000000000"));
        assert!(!rendered.contains("super-secret"));
    }
}
