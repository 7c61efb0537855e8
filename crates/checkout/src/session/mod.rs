//! Apple Pay merchant validation.
//!
//! The browser hands us Apple's `validationURL`; we POST the merchant's
//! identity to it over mutual TLS and relay the opaque session object back.
//! Without a merchant identity, or when Apple refuses, a locally generated
//! session is returned instead so the payment sheet can still be exercised.

use std::time::Duration;

use async_trait::async_trait;
use common::protocol::MerchantValidationResponse;
use common::ServiceError;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::credentials::MerchantIdentity;
use crate::payment::new_order_id;

/// Lifetime of a locally generated session, in milliseconds.
const LOCAL_SESSION_TTL_MS: i64 = 3_600_000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid merchant identity: {0}")]
    Identity(String),

    #[error("merchant validation request failed: {0}")]
    Transport(String),

    #[error("Apple rejected merchant validation with status {0}")]
    Rejected(u16),

    #[error("merchant session is not JSON: {0}")]
    InvalidResponse(String),
}

/// Body POSTed to the validation URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPayload {
    pub merchant_identifier: String,
    pub domain_name: String,
    pub display_name: String,
}

/// Something that can exchange a validation URL for a merchant session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MerchantValidator: Send + Sync {
    async fn validate(&self, url: &Url) -> Result<Value, SessionError>;
}

/// Validator that authenticates with the merchant identity certificate.
pub struct AppleMerchantValidator {
    http: reqwest::Client,
    payload: ValidationPayload,
}

impl AppleMerchantValidator {
    pub fn new(
        identity: &MerchantIdentity,
        payload: ValidationPayload,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let identity = reqwest::Identity::from_pem(&identity.combined_pem())
            .map_err(|e| SessionError::Identity(e.without_url().to_string()))?;
        let http = reqwest::Client::builder()
            .identity(identity)
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Identity(e.without_url().to_string()))?;
        Ok(Self { http, payload })
    }
}

#[async_trait]
impl MerchantValidator for AppleMerchantValidator {
    #[instrument(skip_all, fields(host = url.host_str().unwrap_or("")))]
    async fn validate(&self, url: &Url) -> Result<Value, SessionError> {
        let resp = self
            .http
            .post(url.clone())
            .json(&self.payload)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.without_url().to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(SessionError::Rejected(status));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| SessionError::InvalidResponse(e.without_url().to_string()))
    }
}

/// Parse the client-supplied validation URL; only https is accepted.
pub fn parse_validation_url(raw: Option<&str>) -> Result<Url, ServiceError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("Validation URL is required".into()))?;
    let url = Url::parse(raw)
        .map_err(|_| ServiceError::BadRequest("Validation URL is not a valid URL".into()))?;
    if url.scheme() != "https" {
        return Err(ServiceError::BadRequest("Validation URL must use https".into()));
    }
    Ok(url)
}

/// Which kind of locally generated session to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSession {
    /// No merchant identity is configured.
    Test,
    /// Apple could not be reached or refused the request.
    Fallback,
}

/// A session object in the shape Apple returns, generated locally.
pub fn local_session(kind: LocalSession, display_name: &str) -> Value {
    let now = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    let random = &random[..16];
    let (identifier, nonce, signature) = match kind {
        LocalSession::Test => (
            format!("SSH-TEST-{now}"),
            format!("test-nonce-{random}"),
            "test-signature".to_owned(),
        ),
        LocalSession::Fallback => (
            format!("SSH-{now}"),
            format!("nonce-{random}"),
            format!("sig-{random}"),
        ),
    };
    json!({
        "epochTimestamp": now,
        "expiresAt": now + LOCAL_SESSION_TTL_MS,
        "merchantSessionIdentifier": identifier,
        "nonce": nonce,
        "merchantIdentifier": "merchant.local",
        "domainName": "localhost",
        "displayName": display_name,
        "signature": signature,
    })
}

/// Produce the response for one merchant-validation request.
///
/// Never fails once the URL is valid; Apple failures degrade to a local session.
pub async fn merchant_session(
    validator: Option<&dyn MerchantValidator>,
    url: &Url,
    display_name: &str,
) -> MerchantValidationResponse {
    let Some(validator) = validator else {
        info!("merchant identity not loaded; returning test session");
        return MerchantValidationResponse {
            success: true,
            order_id: None,
            session: local_session(LocalSession::Test, display_name),
        };
    };

    match validator.validate(url).await {
        Ok(session) => {
            let order_id = new_order_id();
            info!(%order_id, "merchant validated");
            MerchantValidationResponse {
                success: true,
                order_id: Some(order_id),
                session,
            }
        }
        Err(e) => {
            warn!(error = %e, "merchant validation failed; returning fallback session");
            MerchantValidationResponse {
                success: true,
                order_id: None,
                session: local_session(LocalSession::Fallback, display_name),
            }
        }
    }
}
