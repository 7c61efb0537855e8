//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CreateSessionQuery, CreateSessionResponse, CredentialStatus, DebugResponse, ErrorResponse,
    HealthResponse, MerchantValidationRequest, MerchantValidationResponse, ProcessPaymentRequest,
    ProcessPaymentResponse, SavePaymentRequest, SavePaymentResponse, SessionRecord,
};
use common::ServiceError;
use serde_json::Value;
use tracing::{info, warn};

use super::state::AppState;
use crate::gateway::CheckoutSessionRequest;
use crate::payment::new_order_id;
use crate::session::{merchant_session, parse_validation_url};

/// [`ServiceError`] rendered as `{success: false, message, error?}`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        let mut body = ErrorResponse::new(self.0.to_string());
        if let Some(detail) = self.0.detail() {
            body = body.with_error(detail.clone());
        }
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::BadRequest(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// `Json` extractor whose rejections use the `{success: false, message}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

fn not_configured() -> ServiceError {
    ServiceError::NotConfigured("Eazypay credentials not configured".into())
}

/// `GET /health`: readiness check.
///
/// Returns `200 OK` when the gateway is configured, `503` otherwise. A missing
/// payment-processing key only disables server-side decryption.
pub async fn health(State(state): State<AppState>) -> Response {
    let key_loaded = state.orchestrator.key_loaded();
    let gateway_configured = state.gateway.is_some();

    let (status_code, status_str) = if gateway_configured {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        key_loaded,
        gateway_configured,
    };
    (status_code, Json(body)).into_response()
}

/// `GET /api/debug`: which credentials are present; never their values.
pub async fn debug(State(state): State<AppState>) -> Json<DebugResponse> {
    fn set(present: bool) -> String {
        let label = if present { "SET" } else { "NOT SET" };
        label.to_owned()
    }
    fn loaded(present: bool) -> String {
        let label = if present { "LOADED" } else { "NOT FOUND" };
        label.to_owned()
    }
    let cfg = &state.config;
    let creds = &state.credentials;
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

    Json(DebugResponse {
        server: "running".into(),
        environment: cfg.environment.clone(),
        credentials: CredentialStatus {
            eazypay_merchant_id: set(has(&cfg.eazypay_merchant_id)),
            eazypay_password: set(has(&cfg.eazypay_password)),
            apple_pay_key: loaded(creds.apple_pay_key().is_some()),
            merchant_id_cert: loaded(creds.merchant_id_cert_found()),
            merchant_id_key: loaded(creds.merchant_id_key_found()),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /api/create-session`: open a hosted-checkout session with the gateway.
pub async fn create_session(
    State(state): State<AppState>,
    Query(query): Query<CreateSessionQuery>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let raw_amount = query
        .amount
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("Amount is required".into()))?;
    if !raw_amount.parse::<f64>().is_ok_and(f64::is_finite) {
        return Err(ServiceError::BadRequest("Amount must be a number".into()).into());
    }
    let amount = raw_amount.to_owned();
    let gateway = state.gateway.as_ref().ok_or_else(not_configured)?;

    let order_id = new_order_id();
    let request = CheckoutSessionRequest::initiate(
        &state.config.checkout_merchant_name,
        state.config.checkout_merchant_logo.as_deref(),
        &amount,
        &query.currency,
        &order_id,
    );

    let resp = gateway
        .initiate_checkout(&request)
        .await
        .map_err(|e| ServiceError::Internal(format!("Failed to create Eazypay session: {e}")))?;
    if !resp.is_success() {
        return Err(ServiceError::Gateway {
            status: resp.status,
            message: "Failed to create Eazypay session".into(),
            body: resp.body,
        }
        .into());
    }
    let Some(session_id) = resp.session_id().map(str::to_owned) else {
        return Err(ServiceError::Gateway {
            status: 500,
            message: "Eazypay response missing session ID".into(),
            body: resp.body,
        }
        .into());
    };

    info!(%order_id, %session_id, "checkout session created");
    Ok(Json(CreateSessionResponse {
        success: true,
        session_id: session_id.clone(),
        db_data: SessionRecord {
            session_id,
            amount,
            currency: query.currency,
            order_id,
            response: resp.body,
        },
    }))
}

/// `POST /api/apple-pay-session`: Apple Pay merchant validation.
pub async fn apple_pay_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MerchantValidationRequest>,
) -> Result<Json<MerchantValidationResponse>, ApiError> {
    let url = parse_validation_url(req.validation_url.as_deref())?;
    let resp = merchant_session(
        state.validator.as_deref(),
        &url,
        &state.config.apple_display_name,
    )
    .await;
    Ok(Json(resp))
}

/// `POST /api/process-apple-pay`: decrypt the token if possible and charge it.
pub async fn process_apple_pay(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>, ApiError> {
    Ok(Json(state.orchestrator.process(req).await?))
}

/// `POST /api/save-payment`: acknowledge a payment record.
pub async fn save_payment(
    ApiJson(req): ApiJson<SavePaymentRequest>,
) -> Result<Json<SavePaymentResponse>, ApiError> {
    let data = req
        .db_data
        .filter(|d| !d.is_null())
        .ok_or_else(|| ServiceError::BadRequest("Payment data is required".into()))?;
    let order_id = data.get("orderId").and_then(Value::as_str).unwrap_or("");
    info!(%order_id, "payment record received");
    Ok(Json(SavePaymentResponse {
        success: true,
        message: "Payment data saved successfully".into(),
        data,
    }))
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}
