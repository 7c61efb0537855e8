//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotConfigured`] → 500
/// - [`ServiceError::Gateway`] → the gateway's own status
/// - [`ServiceError::Declined`] → 400
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: missing field or unparsable payment data.
    #[error("{0}")]
    BadRequest(String),

    /// A required integration (gateway credentials) is not configured.
    #[error("{0}")]
    NotConfigured(String),

    /// The gateway answered with a non-2xx status; the status is passed through.
    #[error("{message}")]
    Gateway {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Caller-facing description.
        message: String,
        /// Raw gateway response body.
        body: serde_json::Value,
    },

    /// The gateway accepted the request but the transaction result was not `SUCCESS`.
    #[error("{message}")]
    Declined {
        /// Caller-facing description.
        message: String,
        /// Raw gateway response body.
        body: serde_json::Value,
    },

    /// An unexpected internal error occurred.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotConfigured(_) => 500,
            ServiceError::Gateway { status, .. } => *status,
            ServiceError::Declined { .. } => 400,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Returns the upstream response body attached to this error, if any.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            ServiceError::Gateway { body, .. } | ServiceError::Declined { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NotConfigured("x".into()).http_status(), 500);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
        let declined = ServiceError::Declined {
            message: "x".into(),
            body: json!({}),
        };
        assert_eq!(declined.http_status(), 400);
    }

    #[test]
    fn gateway_status_is_passed_through() {
        let e = ServiceError::Gateway {
            status: 402,
            message: "Payment authorization failed with Eazypay".into(),
            body: json!({"error": {"cause": "INVALID_REQUEST"}}),
        };
        assert_eq!(e.http_status(), 402);
        assert_eq!(e.detail().unwrap()["error"]["cause"], "INVALID_REQUEST");
    }

    #[test]
    fn display_is_the_bare_message() {
        let e = ServiceError::BadRequest("Amount is required".into());
        assert_eq!(e.to_string(), "Amount is required");
        assert!(e.detail().is_none());
    }
}
