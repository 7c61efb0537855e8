//! Payment Orchestrator: decrypt if possible, then pick the gateway path.
//!
//! # Policy
//!
//! | Decryption outcome | Gateway request |
//! |---|---|
//! | `Success` | `AUTHORIZE` with DPAN, expiry, cryptogram, ECI |
//! | `Failure(_)` (any kind) | `PAY` with the original token string, unmodified |
//!
//! A decryption failure is logged and never surfaced to the payer; only a
//! gateway rejection is.

use std::sync::Arc;

use common::protocol::{ProcessPaymentRequest, ProcessPaymentResponse};
use common::token::EncryptedToken;
use common::ServiceError;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::crypto::{decrypt_with, DecryptError, DecryptionOutcome, MerchantKey};
use crate::gateway::payload::{
    Card, Device, DevicePayment, Expiry, OrderDetails, PosTerminal, ProvidedFunds, SourceOfFunds,
    TransactionDetails, CRYPTOGRAM_FORMAT, DEVICE_ANI, POS_LOCATION, TRANSACTION_SOURCE,
    WALLET_PROVIDER,
};
use crate::gateway::{ApiOperation, Gateway, GatewayPayload};

/// Result value the gateway reports for an approved transaction.
pub const SUCCESS_RESULT: &str = "SUCCESS";

/// Build the gateway request for a decryption outcome.
///
/// `original_token` is forwarded verbatim on the pass-through path.
pub fn plan_payment(
    outcome: &DecryptionOutcome,
    amount: &str,
    currency: &str,
    original_token: &str,
) -> GatewayPayload {
    let order = OrderDetails {
        amount: amount.to_owned(),
        currency: currency.to_owned(),
        wallet_provider: WALLET_PROVIDER,
    };
    let transaction = TransactionDetails {
        source: TRANSACTION_SOURCE,
    };

    match outcome {
        DecryptionOutcome::Success(card) => GatewayPayload {
            api_operation: ApiOperation::Authorize,
            order,
            source_of_funds: SourceOfFunds {
                kind: "CARD",
                provided: ProvidedFunds {
                    card: Card {
                        number: Some(card.dpan.clone()),
                        expiry: Some(Expiry {
                            month: card.expiry.month.clone(),
                            year: card.expiry.year.clone(),
                        }),
                        device_payment: DevicePayment {
                            cryptogram_format: Some(CRYPTOGRAM_FORMAT),
                            online_payment_cryptogram: Some(card.cryptogram.clone()),
                            eci_indicator: Some(card.eci_indicator.clone()),
                            payment_token: None,
                        },
                    },
                },
            },
            device: Some(Device { ani: DEVICE_ANI }),
            pos_terminal: Some(PosTerminal {
                location: POS_LOCATION,
            }),
            transaction,
        },
        DecryptionOutcome::Failure(_) => GatewayPayload {
            api_operation: ApiOperation::Pay,
            order,
            source_of_funds: SourceOfFunds {
                kind: "CARD",
                provided: ProvidedFunds {
                    card: Card {
                        number: None,
                        expiry: None,
                        device_payment: DevicePayment {
                            cryptogram_format: None,
                            online_payment_cryptogram: None,
                            eci_indicator: None,
                            payment_token: Some(original_token.to_owned()),
                        },
                    },
                },
            },
            device: None,
            pos_terminal: None,
            transaction,
        },
    }
}

/// Format a JSON number or numeric string with two fraction digits.
///
/// Ties round away from zero on the shortest decimal form of the value, so
/// `0.125` becomes `0.13`.
pub fn format_amount(amount: &Value) -> Option<String> {
    let value = match amount {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then(|| round_half_up_2(value))
}

fn round_half_up_2(value: f64) -> String {
    // `Display` for f64 never uses exponent notation.
    let magnitude = value.abs().to_string();
    let (int_part, frac_part) = magnitude.split_once('.').unwrap_or((magnitude.as_str(), ""));
    let mut frac = frac_part.bytes().chain(std::iter::repeat(b'0'));
    let (d1, d2, d3) = (frac.next(), frac.next(), frac.next());

    let mut digits: Vec<u8> = int_part.bytes().chain([d1, d2].into_iter().flatten()).collect();
    if d3.is_some_and(|d| d >= b'5') {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - 2;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| char::from(d)));
    out.push('.');
    out.extend(digits[split..].iter().map(|&d| char::from(d)));
    out
}

/// `APPLEPAY-<unix seconds>`.
pub fn new_order_id() -> String {
    format!("APPLEPAY-{}", chrono::Utc::now().timestamp())
}

/// `TXN-<unix seconds>-<random>`; the suffix keeps same-second requests apart.
pub fn new_transaction_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("TXN-{}-{}", chrono::Utc::now().timestamp(), &suffix[..8])
}

/// Pull `token.paymentData` out of the client's payment object.
///
/// Returns the token as the exact string that will be forwarded on the
/// pass-through path.
pub fn extract_token(payment_data: &Value) -> Result<String, ServiceError> {
    let parsed;
    let payment = match payment_data {
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).map_err(|e| {
                ServiceError::BadRequest(format!("Invalid payment data format: {e}"))
            })?;
            &parsed
        }
        other => other,
    };

    let token = payment
        .get("token")
        .filter(|t| !t.is_null())
        .ok_or_else(|| ServiceError::BadRequest("No payment token received from Apple Pay".into()))?;
    let token_data = token
        .get("paymentData")
        .filter(|t| !t.is_null())
        .ok_or_else(|| ServiceError::BadRequest("Payment token missing paymentData".into()))?;

    match token_data {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other).map_err(|e| ServiceError::Internal(e.to_string())),
    }
}

/// Owns the merchant key and gateway for the lifetime of the process.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    key: Option<Arc<MerchantKey>>,
    gateway: Option<Arc<dyn Gateway>>,
}

impl PaymentOrchestrator {
    pub fn new(key: Option<Arc<MerchantKey>>, gateway: Option<Arc<dyn Gateway>>) -> Self {
        Self { key, gateway }
    }

    pub fn key_loaded(&self) -> bool {
        self.key.is_some()
    }

    /// Decrypt a raw token string. Unparsable JSON is a malformed token.
    pub fn decrypt(&self, raw_token: &str) -> DecryptionOutcome {
        match serde_json::from_str::<EncryptedToken>(raw_token) {
            Ok(token) => decrypt_with(&token, self.key.as_deref()),
            Err(_) => DecryptionOutcome::Failure(DecryptError::MalformedToken(
                "token is not a JSON object".into(),
            )),
        }
    }

    /// Run one Apple Pay payment end to end.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::BadRequest`] for missing or unparsable request fields.
    /// - [`ServiceError::NotConfigured`] when no gateway is configured.
    /// - [`ServiceError::Gateway`] when the gateway answers non-2xx.
    /// - [`ServiceError::Declined`] when the result is not `SUCCESS`.
    /// - [`ServiceError::Internal`] on transport or response errors.
    #[instrument(skip_all, fields(order_id = request.order_id.as_deref().unwrap_or("")))]
    pub async fn process(
        &self,
        request: ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, ServiceError> {
        let (amount, payment_data) = match (&request.amount, &request.payment_data) {
            (Some(a), Some(p)) if !a.is_null() && !p.is_null() => (a, p),
            _ => {
                return Err(ServiceError::BadRequest(
                    "Amount and payment data are required".into(),
                ))
            }
        };
        let formatted_amount = format_amount(amount)
            .ok_or_else(|| ServiceError::BadRequest("Amount must be a number".into()))?;
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| ServiceError::NotConfigured("Eazypay credentials not configured".into()))?;

        let raw_token = extract_token(payment_data)?;
        let currency = request.currency.clone().unwrap_or_default();

        let outcome = self.decrypt(&raw_token);
        match &outcome {
            DecryptionOutcome::Success(card) => info!(
                dpan = %card.masked_dpan(),
                expiry = %format!("{}/{}", card.expiry.month, card.expiry.year),
                eci = %card.eci_indicator,
                "token decrypted; submitting card fields"
            ),
            DecryptionOutcome::Failure(e) => warn!(
                kind = e.kind(),
                reason = %e,
                "server-side decryption failed; forwarding encrypted token"
            ),
        }
        let payload = plan_payment(&outcome, &formatted_amount, &currency, &raw_token);
        drop(outcome);

        let order_id = request
            .order_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_order_id);
        let transaction_id = new_transaction_id();

        let resp = gateway
            .submit_transaction(&order_id, &transaction_id, &payload)
            .await
            .map_err(|e| ServiceError::Internal(format!("Error processing payment: {e}")))?;

        if !resp.is_success() {
            warn!(status = resp.status, "gateway rejected payment");
            return Err(ServiceError::Gateway {
                status: resp.status,
                message: "Payment authorization failed with Eazypay".into(),
                body: resp.body,
            });
        }

        let result = resp.transaction_result().unwrap_or_default().to_owned();
        if result != SUCCESS_RESULT {
            warn!(%result, "gateway transaction not successful");
            return Err(ServiceError::Declined {
                message: format!("Payment authorization failed: {result}"),
                body: resp.body,
            });
        }

        info!(%transaction_id, operation = ?payload.api_operation, "payment authorized");
        Ok(ProcessPaymentResponse {
            success: true,
            message: "Payment processed successfully".into(),
            transaction_id,
            amount: amount.clone(),
            currency,
            order_id,
            source: "apple_pay".into(),
            eazypay_result: result,
            eazypay_response: resp.body,
        })
    }
}
