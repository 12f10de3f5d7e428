use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Merchant credentials and URLs for the PayU WebCheckout integration.
#[derive(Debug, Clone)]
pub struct PayuSettings {
    pub merchant_id: String,
    pub account_id: String,
    pub api_key: String,
    pub currency: String,
    pub test_mode: bool,
    pub checkout_url: String,
    /// Base URL PayU uses to reach this API (confirmation and response pages).
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub payu: PayuSettings,
    pub storefront_url: String,
    pub upload_dir: String,
    pub upload_max_bytes: usize,
    pub low_stock_threshold: i32,
    /// Bootstrap administrator, created or promoted at startup when both are set.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parsed("PORT", 8080u16)?;
        let public_base_url =
            optional("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must be at least 32 bytes".to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret,
            jwt_expiration_minutes: parsed("JWT_EXPIRATION_MINUTES", 1440)?,
            payu: PayuSettings {
                merchant_id: required("PAYU_MERCHANT_ID")?,
                account_id: required("PAYU_ACCOUNT_ID")?,
                api_key: required("PAYU_API_KEY")?,
                currency: optional("PAYU_CURRENCY").unwrap_or_else(|| "COP".to_string()),
                test_mode: parsed("PAYU_TEST_MODE", true)?,
                checkout_url: optional("PAYU_CHECKOUT_URL").unwrap_or_else(|| {
                    "https://sandbox.checkout.payulatam.com/ppp-web-gateway-payu/".to_string()
                }),
                public_base_url,
            },
            storefront_url: optional("STOREFRONT_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            upload_dir: optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            upload_max_bytes: parsed("UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            low_stock_threshold: parsed("LOW_STOCK_THRESHOLD", 5)?,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            host,
            port,
        })
    }
}
