//! Request and response types of the checkout HTTP API.
//!
//! Field names follow the browser client's camelCase JSON. Success bodies
//! carry `success: true`; every non-2xx response uses [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Upstream response body, when the failure came from the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
        }
    }

    /// Attach an upstream error body.
    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }
}

// ---------------------------------------------------------------------------
// Gateway checkout session
// ---------------------------------------------------------------------------

fn default_currency() -> String {
    "BHD".into()
}

/// Query string of `GET /api/create-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionQuery {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Successful response body for `GET /api/create-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_id: String,
    #[serde(rename = "DBdata")]
    pub db_data: SessionRecord,
}

/// Record the client later hands back to `POST /api/save-payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub amount: String,
    pub currency: String,
    pub order_id: String,
    /// Raw gateway response.
    pub response: Value,
}

// ---------------------------------------------------------------------------
// Apple Pay merchant validation
// ---------------------------------------------------------------------------

/// Request body for `POST /api/apple-pay-session`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantValidationRequest {
    #[serde(rename = "validationURL", default)]
    pub validation_url: Option<String>,
}

/// Response body for `POST /api/apple-pay-session`.
///
/// `session` is opaque to the server and handed straight to
/// `completeMerchantValidation` in the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantValidationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub session: Value,
}

// ---------------------------------------------------------------------------
// Apple Pay payment processing
// ---------------------------------------------------------------------------

/// Request body for `POST /api/process-apple-pay`.
///
/// `amount` may arrive as a JSON number or string. `payment_data` is the
/// `ApplePayPayment` object, or its JSON serialisation as a string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_data: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Successful response body for `POST /api/process-apple-pay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    pub success: bool,
    pub message: String,
    pub transaction_id: String,
    pub amount: Value,
    pub currency: String,
    pub order_id: String,
    pub source: String,
    pub eazypay_result: String,
    pub eazypay_response: Value,
}

// ---------------------------------------------------------------------------
// Payment record
// ---------------------------------------------------------------------------

/// Request body for `POST /api/save-payment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavePaymentRequest {
    #[serde(rename = "DBdata", default)]
    pub db_data: Option<Value>,
}

/// Response body for `POST /api/save-payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePaymentResponse {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the payment-processing key is loaded (server-side decryption possible).
    pub key_loaded: bool,
    /// Whether gateway credentials are configured.
    pub gateway_configured: bool,
}

/// Response body for `GET /api/debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugResponse {
    pub server: String,
    pub environment: String,
    pub credentials: CredentialStatus,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Presence flags only; never values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub eazypay_merchant_id: String,
    pub eazypay_password: String,
    pub apple_pay_key: String,
    pub merchant_id_cert: String,
    pub merchant_id_key: String,
}
