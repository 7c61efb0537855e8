//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::gateway::Gateway;
use crate::payment::PaymentOrchestrator;
use crate::session::MerchantValidator;

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed so Axum can clone the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration (non-secret fields are read by handlers).
    pub config: Arc<Config>,
    /// Keys and certificates loaded at startup.
    pub credentials: Credentials,
    /// Card gateway; absent when credentials are not configured.
    pub gateway: Option<Arc<dyn Gateway>>,
    /// Merchant validator; absent when no merchant identity is loaded.
    pub validator: Option<Arc<dyn MerchantValidator>>,
    /// Decrypt-or-forward payment pipeline.
    pub orchestrator: PaymentOrchestrator,
}

impl AppState {
    pub fn new(
        config: Config,
        credentials: Credentials,
        gateway: Option<Arc<dyn Gateway>>,
        validator: Option<Arc<dyn MerchantValidator>>,
    ) -> Self {
        let orchestrator =
            PaymentOrchestrator::new(credentials.apple_pay_key().cloned(), gateway.clone());
        Self {
            config: Arc::new(config),
            credentials,
            gateway,
            validator,
            orchestrator,
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    /// No credentials, no gateway, no validator.
    fn default() -> Self {
        Self::new(crate::config::test_config(), Credentials::default(), None, None)
    }
}
