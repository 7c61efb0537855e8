//! Card-gateway integration.
//!
//! # Responsibilities
//! - Define the [`Gateway`] seam the orchestrator and handlers talk to.
//! - Describe gateway request bodies ([`payload`]).
//! - Implement the seam against the Eazypay (Mastercard Gateway) REST API ([`eazypay`]).
//!
//! The gateway's authorization semantics are opaque here: responses are
//! returned as raw JSON plus status, and only the `result` field is inspected.

pub mod eazypay;
pub mod payload;

pub use eazypay::EazypayClient;
pub use payload::{ApiOperation, CheckoutSessionRequest, GatewayPayload};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The configured base URL cannot carry path segments.
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),

    /// Connection, TLS, or timeout failure.
    #[error("gateway request failed: {0}")]
    Transport(String),

    /// The gateway answered with a body that is not JSON.
    #[error("gateway returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Status and JSON body of a gateway response.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `transaction.result`, falling back to the top-level `result`.
    pub fn transaction_result(&self) -> Option<&str> {
        self.body
            .get("transaction")
            .and_then(|t| t.get("result"))
            .and_then(Value::as_str)
            .or_else(|| self.body.get("result").and_then(Value::as_str))
    }

    /// `session.id` of a checkout-session response.
    pub fn session_id(&self) -> Option<&str> {
        self.body
            .get("session")
            .and_then(|s| s.get("id"))
            .and_then(Value::as_str)
    }
}

/// An external card gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Create a hosted-checkout session.
    async fn initiate_checkout(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Submit one transaction for `order_id`.
    async fn submit_transaction(
        &self,
        order_id: &str,
        transaction_id: &str,
        payload: &GatewayPayload,
    ) -> Result<GatewayResponse, GatewayError>;
}
