//! Tracing setup: structured JSON logs, plus OTLP span export when an
//! endpoint is configured.
//!
//! # Telemetry invariants
//!
//! - **No card data or key material** must appear in any span attribute or log
//!   field. DPANs are logged masked (first six digits), cryptograms by length.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
