//! `checkout`: Apple Pay checkout service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Load the payment-processing key and merchant identity.
//! 4. Build the gateway client and merchant validator from what was loaded.
//! 5. Build the Axum router and start the HTTP server.

mod config;
mod credentials;
mod crypto;
mod gateway;
mod payment;
mod server;
mod session;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use config::Config;
use gateway::{EazypayClient, Gateway};
use server::state::AppState;
use session::{AppleMerchantValidator, MerchantValidator, ValidationPayload};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        environment = %cfg.environment,
        "checkout starting"
    );

    // -----------------------------------------------------------------------
    // 3. Credentials
    // -----------------------------------------------------------------------
    let creds = credentials::load(&cfg);
    let timeout = Duration::from_secs(cfg.gateway_timeout_secs);

    // -----------------------------------------------------------------------
    // 4. Outbound clients
    // -----------------------------------------------------------------------
    let gateway: Option<Arc<dyn Gateway>> = match cfg.gateway_credentials() {
        Some(gw_creds) => {
            let client = EazypayClient::new(&cfg.eazypay_base_url, gw_creds, timeout)?;
            info!(base_url = %cfg.eazypay_base_url, "gateway client ready");
            Some(Arc::new(client))
        }
        None => {
            warn!("EAZYPAY_MERCHANT_ID / EAZYPAY_PASSWORD not set; payment endpoints will fail");
            None
        }
    };

    let validator: Option<Arc<dyn MerchantValidator>> = match creds.merchant_identity() {
        Some(identity) => {
            let payload = ValidationPayload {
                merchant_identifier: cfg.apple_merchant_identifier.clone(),
                domain_name: cfg.apple_domain_name.clone(),
                display_name: cfg.apple_display_name.clone(),
            };
            match AppleMerchantValidator::new(identity, payload, timeout) {
                Ok(v) => Some(Arc::new(v)),
                Err(e) => {
                    warn!(error = %e, "merchant identity rejected; merchant validation will return mock sessions");
                    None
                }
            }
        }
        None => None,
    };

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let state = AppState::new(cfg, creds, gateway, validator);
    let router = server::router::build(state);

    info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
