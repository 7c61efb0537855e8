//! Configuration loading and validation for the checkout service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is present but invalid.
//! Absent credentials are not an error: the corresponding feature degrades
//! (mock merchant session, encrypted-token pass-through, gateway 500s).

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated checkout service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional OTLP endpoint; spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Deployment label reported by `/api/debug`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Payment-processing private key: base64-wrapped PEM or inline PEM.
    #[serde(default)]
    pub apple_pay_key: Option<String>,

    /// Local fallback file for the payment-processing key.
    #[serde(default = "default_apple_pay_key_path")]
    pub apple_pay_key_path: String,

    /// Merchant identity certificate (PEM text).
    #[serde(default)]
    pub merchant_id_cert: Option<String>,

    #[serde(default = "default_merchant_id_cert_path")]
    pub merchant_id_cert_path: String,

    /// Merchant identity private key: base64-wrapped PEM or inline PEM.
    #[serde(default)]
    pub merchant_id_key: Option<String>,

    #[serde(default = "default_merchant_id_key_path")]
    pub merchant_id_key_path: String,

    /// Apple merchant identifier sent during merchant validation.
    #[serde(default = "default_merchant_identifier")]
    pub apple_merchant_identifier: String,

    /// Domain registered with Apple for this merchant.
    #[serde(default = "default_domain_name")]
    pub apple_domain_name: String,

    /// Name shown on the payment sheet.
    #[serde(default = "default_display_name")]
    pub apple_display_name: String,

    /// Gateway merchant ID.
    #[serde(default)]
    pub eazypay_merchant_id: Option<String>,

    /// Gateway API password.
    #[serde(default)]
    pub eazypay_password: Option<String>,

    /// Gateway REST base URL, including the API version.
    #[serde(default = "default_eazypay_base_url")]
    pub eazypay_base_url: String,

    /// Merchant name for hosted-checkout sessions.
    #[serde(default = "default_checkout_merchant_name")]
    pub checkout_merchant_name: String,

    /// Merchant logo URL for hosted-checkout sessions.
    #[serde(default)]
    pub checkout_merchant_logo: Option<String>,

    /// Directory holding `apple-developer-merchantid-domain-association`.
    #[serde(default = "default_well_known_dir")]
    pub well_known_dir: String,

    /// Timeout (seconds) for outbound gateway and Apple calls.
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,
}

fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_apple_pay_key_path() -> String {
    "csr/paymentprocessing.key".into()
}
fn default_merchant_id_cert_path() -> String {
    "certs/merchant_id.pem".into()
}
fn default_merchant_id_key_path() -> String {
    "csr/merchantidentity.key".into()
}
fn default_merchant_identifier() -> String {
    "merchant.com.example.checkout".into()
}
fn default_domain_name() -> String {
    "localhost".into()
}
fn default_display_name() -> String {
    "Checkout".into()
}
fn default_eazypay_base_url() -> String {
    "https://eazypay.gateway.mastercard.com/api/rest/version/100".into()
}
fn default_checkout_merchant_name() -> String {
    "Checkout".into()
}
fn default_well_known_dir() -> String {
    ".well-known".into()
}
fn default_gateway_timeout() -> u64 {
    30
}

/// Gateway credentials, present only when both halves are configured.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub merchant_id: String,
    pub password: String,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("merchant_id", &self.merchant_id)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Gateway credentials, if both merchant ID and password are set.
    pub fn gateway_credentials(&self) -> Option<GatewayCredentials> {
        match (non_empty(&self.eazypay_merchant_id), non_empty(&self.eazypay_password)) {
            (Some(merchant_id), Some(password)) => Some(GatewayCredentials {
                merchant_id: merchant_id.to_owned(),
                password: password.to_owned(),
            }),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        if self.gateway_timeout_secs == 0 {
            anyhow::bail!("GATEWAY_TIMEOUT_SECS must be > 0");
        }
        ensure_non_empty(&self.apple_merchant_identifier, "APPLE_MERCHANT_IDENTIFIER")?;
        ensure_non_empty(&self.apple_domain_name, "APPLE_DOMAIN_NAME")?;

        let base = reqwest::Url::parse(&self.eazypay_base_url)
            .context("EAZYPAY_BASE_URL must be an absolute URL")?;
        if base.scheme() != "https" {
            anyhow::bail!("EAZYPAY_BASE_URL must use https");
        }

        if non_empty(&self.eazypay_merchant_id).is_some() != non_empty(&self.eazypay_password).is_some() {
            anyhow::bail!("EAZYPAY_MERCHANT_ID and EAZYPAY_PASSWORD must be set together");
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        port: default_port(),
        log_level: default_log_level(),
        otel_exporter_otlp_endpoint: None,
        environment: default_environment(),
        apple_pay_key: None,
        apple_pay_key_path: "/nonexistent/paymentprocessing.key".into(),
        merchant_id_cert: None,
        merchant_id_cert_path: "/nonexistent/merchant_id.pem".into(),
        merchant_id_key: None,
        merchant_id_key_path: "/nonexistent/merchantidentity.key".into(),
        apple_merchant_identifier: default_merchant_identifier(),
        apple_domain_name: default_domain_name(),
        apple_display_name: default_display_name(),
        eazypay_merchant_id: None,
        eazypay_password: None,
        eazypay_base_url: default_eazypay_base_url(),
        checkout_merchant_name: default_checkout_merchant_name(),
        checkout_merchant_logo: None,
        well_known_dir: default_well_known_dir(),
        gateway_timeout_secs: default_gateway_timeout(),
    }
}
