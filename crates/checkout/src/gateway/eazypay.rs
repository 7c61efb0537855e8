//! [`EazypayClient`]: Mastercard Gateway REST client with Basic auth.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{CheckoutSessionRequest, Gateway, GatewayError, GatewayPayload, GatewayResponse};
use crate::config::GatewayCredentials;

/// REST client for one gateway merchant.
#[derive(Debug, Clone)]
pub struct EazypayClient {
    http: Client,
    base_url: Url,
    credentials: GatewayCredentials,
}

impl EazypayClient {
    /// Build a client for `base_url` (including the API version path).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidUrl`] if `base_url` does not parse or
    /// cannot carry path segments, and [`GatewayError::Transport`] if the HTTP
    /// client cannot be constructed.
    pub fn new(
        base_url: &str,
        credentials: GatewayCredentials,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let base_url =
            Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// API username: `merchant.<merchant id>`.
    fn username(&self) -> String {
        format!("merchant.{}", self.credentials.merchant_id)
    }

    /// `<base>/merchant/<id>/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("merchant")
            .push(&self.credentials.merchant_id)
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<GatewayResponse, GatewayError> {
        let resp = self
            .http
            .request(method, url)
            .basic_auth(self.username(), Some(&self.credentials.password))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url().to_string()))?;

        let status = resp.status().as_u16();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.without_url().to_string()))?;
        debug!(status, "gateway responded");
        Ok(GatewayResponse { status, body })
    }
}

#[async_trait]
impl Gateway for EazypayClient {
    #[instrument(skip_all, fields(order_id = %request.order.id))]
    async fn initiate_checkout(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.endpoint(&["session"])?;
        self.send(Method::POST, url, request).await
    }

    #[instrument(skip_all, fields(%order_id, %transaction_id, operation = ?payload.api_operation))]
    async fn submit_transaction(
        &self,
        order_id: &str,
        transaction_id: &str,
        payload: &GatewayPayload,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.endpoint(&["order", order_id, "transaction", transaction_id])?;
        self.send(Method::PUT, url, payload).await
    }
}
