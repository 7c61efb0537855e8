//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Per-request timeout; outbound gateway calls must finish inside it.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest accepted JSON body. Apple Pay payment objects are a few KiB.
pub const BODY_LIMIT: usize = 64 * 1024;
