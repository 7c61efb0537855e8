//! Token Decryptor: `EC_v1` payment token → [`DecryptionOutcome`].
//!
//! Each call is a pure, synchronous computation over borrowed inputs. Nothing
//! here performs I/O, retries, or keeps state between calls, so one
//! [`MerchantKey`] can serve any number of concurrent decryptions.

use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes256,
    AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::token::{EncryptedToken, EC_V1};
use p256::{ecdh::diffie_hellman, PublicKey};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use super::kdf::derive_symmetric_key;
use super::key::MerchantKey;

/// AES-256-GCM with the 16-byte IV used by `EC_v1` tokens.
pub(crate) type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Byte length of the IV that prefixes `data`.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag that suffixes `data`.
pub const TAG_LEN: usize = 16;

/// Length of an uncompressed SEC1 P-256 point (`0x04 || X || Y`).
const UNCOMPRESSED_POINT_LEN: usize = 65;

/// ECI used when the payload carries none.
pub const DEFAULT_ECI_INDICATOR: &str = "20";

const FALLBACK_EXPIRY_YEAR: &str = "25";
const FALLBACK_EXPIRY_MONTH: &str = "01";

/// Why a token could not be decrypted.
///
/// Every variant is recoverable: the caller falls back to forwarding the
/// encrypted token unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Required fields missing, bad base64, unsupported version, or bad framing.
    #[error("{0}")]
    MalformedToken(String),

    /// The ephemeral public key is not a valid uncompressed P-256 point.
    #[error("key agreement failed")]
    KeyAgreementFailure,

    /// The GCM tag did not verify (tampering, or the wrong merchant key).
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The plaintext is not JSON or lacks a required field.
    #[error("invalid decrypted payload: {0}")]
    PayloadParseFailure(String),

    /// No payment-processing key is configured.
    #[error("merchant private key not loaded")]
    KeyUnavailable,
}

impl DecryptError {
    /// Short stable label for log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecryptError::MalformedToken(_) => "malformed_token",
            DecryptError::KeyAgreementFailure => "key_agreement_failure",
            DecryptError::AuthenticationFailure => "authentication_failure",
            DecryptError::PayloadParseFailure(_) => "payload_parse_failure",
            DecryptError::KeyUnavailable => "key_unavailable",
        }
    }
}

/// Card expiry split out of `applicationExpirationDate` (`YYMMDD`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardExpiry {
    /// Two-digit year.
    pub year: String,
    /// Two-digit month.
    pub month: String,
}

impl CardExpiry {
    /// Take `[0..2]` as the year and `[2..4]` as the month.
    ///
    /// Strings too short to hold both fall back to `25`/`01`.
    pub fn from_application_date(date: &str) -> Self {
        match (date.get(0..2), date.get(2..4)) {
            (Some(year), Some(month)) => Self {
                year: year.to_owned(),
                month: month.to_owned(),
            },
            _ => Self {
                year: FALLBACK_EXPIRY_YEAR.to_owned(),
                month: FALLBACK_EXPIRY_MONTH.to_owned(),
            },
        }
    }
}

/// Card fields recovered from a decrypted token.
///
/// `Debug` masks the DPAN and cryptogram; both are wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedCardPayload {
    /// Device Primary Account Number.
    pub dpan: String,
    pub expiry: CardExpiry,
    /// Online payment cryptogram (base64).
    pub cryptogram: String,
    pub eci_indicator: String,
    /// `header.transactionId` of the source token.
    pub transaction_id: String,
}

impl DecryptedCardPayload {
    /// First six DPAN digits followed by a mask; safe to log.
    pub fn masked_dpan(&self) -> String {
        let prefix: String = self.dpan.chars().take(6).collect();
        format!("{prefix}******")
    }
}

impl std::fmt::Debug for DecryptedCardPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedCardPayload")
            .field("dpan", &self.masked_dpan())
            .field("dpan_len", &self.dpan.len())
            .field("expiry", &self.expiry)
            .field("cryptogram_len", &self.cryptogram.len())
            .field("eci_indicator", &self.eci_indicator)
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}

impl Drop for DecryptedCardPayload {
    fn drop(&mut self) {
        self.dpan.zeroize();
        self.cryptogram.zeroize();
    }
}

/// Result of one decryption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionOutcome {
    Success(DecryptedCardPayload),
    Failure(DecryptError),
}

impl DecryptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DecryptionOutcome::Success(_))
    }
}

impl From<Result<DecryptedCardPayload, DecryptError>> for DecryptionOutcome {
    fn from(result: Result<DecryptedCardPayload, DecryptError>) -> Self {
        match result {
            Ok(payload) => DecryptionOutcome::Success(payload),
            Err(e) => DecryptionOutcome::Failure(e),
        }
    }
}

/// Decrypt `token` with `key`.
pub fn decrypt(token: &EncryptedToken, key: &MerchantKey) -> DecryptionOutcome {
    try_decrypt(token, key).into()
}

/// Decrypt `token` with an optional key, classifying an absent key as
/// [`DecryptError::KeyUnavailable`].
pub fn decrypt_with(token: &EncryptedToken, key: Option<&MerchantKey>) -> DecryptionOutcome {
    match key {
        Some(key) => decrypt(token, key),
        None => DecryptionOutcome::Failure(DecryptError::KeyUnavailable),
    }
}

fn try_decrypt(
    token: &EncryptedToken,
    key: &MerchantKey,
) -> Result<DecryptedCardPayload, DecryptError> {
    if token.version != EC_V1 {
        return Err(DecryptError::MalformedToken(format!(
            "unsupported token version: {:?}",
            token.version
        )));
    }
    let missing = token.missing_fields();
    if !missing.is_empty() {
        return Err(DecryptError::MalformedToken(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let raw = STANDARD
        .decode(token.data.trim())
        .map_err(|_| DecryptError::MalformedToken("data is not valid base64".into()))?;
    if raw.len() < IV_LEN + TAG_LEN {
        return Err(DecryptError::MalformedToken(
            "malformed ciphertext framing".into(),
        ));
    }
    let (iv, sealed) = raw.split_at(IV_LEN);

    let ephemeral = STANDARD
        .decode(token.header.ephemeral_public_key.trim())
        .map_err(|_| {
            DecryptError::MalformedToken("ephemeralPublicKey is not valid base64".into())
        })?;

    debug!(
        transaction_id = %token.header.transaction_id,
        data_len = raw.len(),
        "decrypting payment token"
    );

    let symmetric_key = {
        let shared = agree(key, &ephemeral)?;
        derive_symmetric_key(shared.raw_secret_bytes().as_slice())
    };

    let cipher = Aes256Gcm16::new_from_slice(&symmetric_key[..])
        .map_err(|_| DecryptError::AuthenticationFailure)?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::<U16>::from_slice(iv), sealed)
            .map_err(|_| DecryptError::AuthenticationFailure)?,
    );

    let payload = parse_plaintext(&plaintext, &token.header.transaction_id)?;
    debug!(
        transaction_id = %payload.transaction_id,
        dpan = %payload.masked_dpan(),
        cryptogram_len = payload.cryptogram.len(),
        eci = %payload.eci_indicator,
        "payment token decrypted"
    );
    Ok(payload)
}

fn agree(key: &MerchantKey, ephemeral: &[u8]) -> Result<p256::ecdh::SharedSecret, DecryptError> {
    if ephemeral.len() != UNCOMPRESSED_POINT_LEN || ephemeral[0] != 0x04 {
        return Err(DecryptError::KeyAgreementFailure);
    }
    let public =
        PublicKey::from_sec1_bytes(ephemeral).map_err(|_| DecryptError::KeyAgreementFailure)?;
    Ok(diffie_hellman(
        key.secret().to_nonzero_scalar(),
        public.as_affine(),
    ))
}

/// Extract card fields from the decrypted JSON.
///
/// Works on a [`Value`] rather than a typed struct so that error messages name
/// the offending field without echoing its contents. `onlinePaymentCryptogram`
/// and `eciIndicator` are read from the top level first, then from the nested
/// `paymentData` object used by 3-D Secure payloads.
fn parse_plaintext(
    plaintext: &[u8],
    transaction_id: &str,
) -> Result<DecryptedCardPayload, DecryptError> {
    let text = std::str::from_utf8(plaintext)
        .map_err(|_| DecryptError::PayloadParseFailure("not valid UTF-8".into()))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|_| DecryptError::PayloadParseFailure("not valid JSON".into()))?;

    let nested = value.get("paymentData");
    let either = |name: &str| {
        non_empty_str(&value, name).or_else(|| nested.and_then(|n| non_empty_str(n, name)))
    };

    let dpan = non_empty_str(&value, "applicationPrimaryAccountNumber")
        .ok_or_else(|| missing("applicationPrimaryAccountNumber"))?;
    let expiry = value
        .get("applicationExpirationDate")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("applicationExpirationDate"))?;
    let cryptogram =
        either("onlinePaymentCryptogram").ok_or_else(|| missing("onlinePaymentCryptogram"))?;
    let eci = either("eciIndicator").unwrap_or(DEFAULT_ECI_INDICATOR);

    Ok(DecryptedCardPayload {
        dpan: dpan.to_owned(),
        expiry: CardExpiry::from_application_date(expiry),
        cryptogram: cryptogram.to_owned(),
        eci_indicator: eci.to_owned(),
        transaction_id: transaction_id.to_owned(),
    })
}

fn non_empty_str<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn missing(field: &str) -> DecryptError {
    DecryptError::PayloadParseFailure(format!("missing or non-string field `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::fixtures::{self, reference_key, reference_token, seal};
    use common::token::TokenHeader;
    use serde_json::json;

    fn card_json() -> Value {
        json!({
            "applicationPrimaryAccountNumber": "5204245250001488",
            "applicationExpirationDate": "271031",
            "currencyCode": "048",
            "transactionAmount": 1500,
            "onlinePaymentCryptogram": "AgAAAAAABk4DWZ4C28yUQAAAAAA=",
            "eciIndicator": "05"
        })
    }

    fn expect_failure(outcome: DecryptionOutcome) -> DecryptError {
        match outcome {
            DecryptionOutcome::Failure(e) => e,
            DecryptionOutcome::Success(p) => panic!("expected failure, got {p:?}"),
        }
    }

    fn expect_success(outcome: DecryptionOutcome) -> DecryptedCardPayload {
        match outcome {
            DecryptionOutcome::Success(p) => p,
            DecryptionOutcome::Failure(e) => panic!("expected success, got {e}"),
        }
    }

    #[test]
    fn decrypts_reference_token() {
        let payload = expect_success(decrypt(&reference_token(), &reference_key()));
        assert_eq!(payload.dpan, fixtures::REFERENCE_DPAN);
        assert_eq!(payload.cryptogram, fixtures::REFERENCE_CRYPTOGRAM);
        assert_eq!(payload.expiry.year, "28");
        assert_eq!(payload.expiry.month, "12");
        assert_eq!(payload.eci_indicator, "07");
        assert_eq!(payload.transaction_id, fixtures::REFERENCE_TRANSACTION_ID);
    }

    #[test]
    fn round_trips_sealed_payload() {
        let key = reference_key();
        let token = seal(&card_json(), &key);
        let payload = expect_success(decrypt(&token, &key));
        assert_eq!(payload.dpan, "5204245250001488");
        assert_eq!(payload.expiry, CardExpiry { year: "27".into(), month: "10".into() });
        assert_eq!(payload.cryptogram, "AgAAAAAABk4DWZ4C28yUQAAAAAA=");
        assert_eq!(payload.eci_indicator, "05");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let other = MerchantKey::from(p256::SecretKey::from_slice(&[0x33; 32]).unwrap());
        let err = expect_failure(decrypt(&reference_token(), &other));
        assert_eq!(err, DecryptError::AuthenticationFailure);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut token = reference_token();
        let mut raw = STANDARD.decode(&token.data).unwrap();
        raw[IV_LEN + 3] ^= 0x01;
        token.data = STANDARD.encode(raw);
        let err = expect_failure(decrypt(&token, &reference_key()));
        assert_eq!(err, DecryptError::AuthenticationFailure);
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let mut token = reference_token();
        let mut raw = STANDARD.decode(&token.data).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x80;
        token.data = STANDARD.encode(raw);
        let err = expect_failure(decrypt(&token, &reference_key()));
        assert_eq!(err, DecryptError::AuthenticationFailure);
    }

    #[test]
    fn tampered_iv_fails_authentication() {
        let mut token = reference_token();
        let mut raw = STANDARD.decode(&token.data).unwrap();
        raw[0] ^= 0xFF;
        token.data = STANDARD.encode(raw);
        assert_eq!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::AuthenticationFailure
        );
    }

    #[test]
    fn point_off_curve_fails_key_agreement() {
        let mut token = reference_token();
        let mut point = vec![0x04u8];
        point.extend_from_slice(&[0x01; 64]);
        token.header.ephemeral_public_key = STANDARD.encode(point);
        let err = expect_failure(decrypt(&token, &reference_key()));
        assert_eq!(err, DecryptError::KeyAgreementFailure);
    }

    #[test]
    fn compressed_point_fails_key_agreement() {
        let mut token = reference_token();
        let raw = STANDARD.decode(&token.header.ephemeral_public_key).unwrap();
        let mut compressed = vec![0x02 | (raw[64] & 1)];
        compressed.extend_from_slice(&raw[1..33]);
        token.header.ephemeral_public_key = STANDARD.encode(compressed);
        assert_eq!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::KeyAgreementFailure
        );
    }

    #[test]
    fn short_data_is_malformed() {
        let mut token = reference_token();
        token.data = STANDARD.encode([0u8; 31]);
        let err = expect_failure(decrypt(&token, &reference_key()));
        assert_eq!(
            err,
            DecryptError::MalformedToken("malformed ciphertext framing".into())
        );
    }

    #[test]
    fn short_data_is_rejected_before_key_agreement() {
        // An invalid point would yield KeyAgreementFailure if it were reached.
        let mut token = reference_token();
        token.data = STANDARD.encode([0u8; 8]);
        token.header.ephemeral_public_key = STANDARD.encode([0x04u8; 65]);
        assert!(matches!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::MalformedToken(_)
        ));
    }

    #[test]
    fn exactly_iv_and_tag_reaches_authentication() {
        let mut token = reference_token();
        token.data = STANDARD.encode([0u8; IV_LEN + TAG_LEN]);
        assert_eq!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::AuthenticationFailure
        );
    }

    #[test]
    fn bad_base64_is_malformed() {
        let mut token = reference_token();
        token.data = "***not base64***".into();
        assert!(matches!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::MalformedToken(_)
        ));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let token = EncryptedToken {
            version: EC_V1.into(),
            data: reference_token().data,
            signature: String::new(),
            header: TokenHeader::default(),
        };
        match expect_failure(decrypt(&token, &reference_key())) {
            DecryptError::MalformedToken(msg) => {
                assert!(msg.contains("signature"));
                assert!(msg.contains("ephemeralPublicKey"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_is_malformed() {
        let mut token = reference_token();
        token.version = "RSA_v1".into();
        assert!(matches!(
            expect_failure(decrypt(&token, &reference_key())),
            DecryptError::MalformedToken(_)
        ));
    }

    #[test]
    fn absent_key_is_key_unavailable() {
        assert_eq!(
            expect_failure(decrypt_with(&reference_token(), None)),
            DecryptError::KeyUnavailable
        );
        assert!(decrypt_with(&reference_token(), Some(&reference_key())).is_success());
    }

    #[test]
    fn missing_cryptogram_is_payload_failure() {
        let key = reference_key();
        let mut card = card_json();
        card.as_object_mut().unwrap().remove("onlinePaymentCryptogram");
        let err = expect_failure(decrypt(&seal(&card, &key), &key));
        assert!(matches!(err, DecryptError::PayloadParseFailure(ref m) if m.contains("onlinePaymentCryptogram")));
    }

    #[test]
    fn missing_dpan_is_payload_failure() {
        let key = reference_key();
        let mut card = card_json();
        card.as_object_mut().unwrap().remove("applicationPrimaryAccountNumber");
        assert!(matches!(
            expect_failure(decrypt(&seal(&card, &key), &key)),
            DecryptError::PayloadParseFailure(_)
        ));
    }

    #[test]
    fn non_json_plaintext_is_payload_failure() {
        let key = reference_key();
        let token = fixtures::seal_bytes(b"definitely not json", &key);
        assert_eq!(
            expect_failure(decrypt(&token, &key)),
            DecryptError::PayloadParseFailure("not valid JSON".into())
        );
    }

    #[test]
    fn payload_error_does_not_echo_values() {
        let key = reference_key();
        let mut card = card_json();
        card["applicationPrimaryAccountNumber"] = json!(5204245250001488u64);
        let err = expect_failure(decrypt(&seal(&card, &key), &key));
        assert!(!err.to_string().contains("5204245250001488"));
    }

    #[test]
    fn missing_eci_defaults_to_20() {
        let key = reference_key();
        let mut card = card_json();
        card.as_object_mut().unwrap().remove("eciIndicator");
        let payload = expect_success(decrypt(&seal(&card, &key), &key));
        assert_eq!(payload.eci_indicator, DEFAULT_ECI_INDICATOR);
    }

    #[test]
    fn nested_three_d_secure_fields_are_used() {
        let key = reference_key();
        let card = json!({
            "applicationPrimaryAccountNumber": "4817499999999991",
            "applicationExpirationDate": "300228",
            "paymentDataType": "3DSecure",
            "paymentData": {
                "onlinePaymentCryptogram": "Af9x/QwAA/DjmU65oyc1MAABAAA=",
                "eciIndicator": "7"
            }
        });
        let payload = expect_success(decrypt(&seal(&card, &key), &key));
        assert_eq!(payload.cryptogram, "Af9x/QwAA/DjmU65oyc1MAABAAA=");
        assert_eq!(payload.eci_indicator, "7");
    }

    #[test]
    fn four_char_expiry_splits_year_then_month() {
        let key = reference_key();
        let mut card = card_json();
        card["applicationExpirationDate"] = json!("2512");
        let payload = expect_success(decrypt(&seal(&card, &key), &key));
        assert_eq!(payload.expiry.year, "25");
        assert_eq!(payload.expiry.month, "12");
    }

    #[test]
    fn one_char_expiry_uses_fallback() {
        let key = reference_key();
        let mut card = card_json();
        card["applicationExpirationDate"] = json!("2");
        let payload = expect_success(decrypt(&seal(&card, &key), &key));
        assert_eq!(payload.expiry.year, "25");
        assert_eq!(payload.expiry.month, "01");
    }

    #[test]
    fn expiry_parsing_rule() {
        let e = CardExpiry::from_application_date("291130");
        assert_eq!((e.year.as_str(), e.month.as_str()), ("29", "11"));
        let e = CardExpiry::from_application_date("");
        assert_eq!((e.year.as_str(), e.month.as_str()), ("25", "01"));
        let e = CardExpiry::from_application_date("251");
        assert_eq!((e.year.as_str(), e.month.as_str()), ("25", "01"));
    }

    #[test]
    fn debug_masks_card_data() {
        let payload = expect_success(decrypt(&reference_token(), &reference_key()));
        let rendered = format!("{payload:?}");
        assert!(rendered.contains("481749******"));
        assert!(!rendered.contains(fixtures::REFERENCE_DPAN));
        assert!(!rendered.contains(fixtures::REFERENCE_CRYPTOGRAM));
    }

    #[test]
    fn concurrent_decryptions_do_not_interfere() {
        use std::sync::Arc;

        let key = Arc::new(reference_key());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let key = Arc::clone(&key);
                std::thread::spawn(move || {
                    let dpan = format!("52042452500014{i:02}");
                    let mut card = card_json();
                    card["applicationPrimaryAccountNumber"] = json!(dpan.clone());
                    let token = seal(&card, &key);
                    (dpan, decrypt(&token, &key))
                })
            })
            .collect();

        for handle in handles {
            let (dpan, outcome) = handle.join().unwrap();
            assert_eq!(expect_success(outcome).dpan, dpan);
        }
    }
}
