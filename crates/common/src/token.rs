//! Apple Pay payment token wire structure, as delivered by the payment sheet in
//! `payment.token.paymentData`.
//!
//! Every field carries `#[serde(default)]` so that a structurally incomplete
//! token still deserialises; completeness is judged by the decryptor, which
//! classifies missing fields as a malformed token instead of a parse error.

use serde::{Deserialize, Serialize};

/// The only cryptogram scheme this service decrypts.
pub const EC_V1: &str = "EC_v1";

/// Encrypted payment data plus the metadata needed to decrypt it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedToken {
    /// Cryptogram scheme identifier, e.g. `"EC_v1"`.
    #[serde(default)]
    pub version: String,
    /// Base64 ciphertext blob: IV, ciphertext, authentication tag.
    #[serde(default)]
    pub data: String,
    /// Base64 detached signature. Carried through, never verified here.
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub header: TokenHeader,
}

/// Token header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHeader {
    /// Base64 uncompressed SEC1 P-256 point.
    #[serde(default)]
    pub ephemeral_public_key: String,
    /// Hex transaction identifier.
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_hash: Option<String>,
}

impl EncryptedToken {
    /// Names of required fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.data.is_empty() {
            missing.push("data");
        }
        if self.signature.is_empty() {
            missing.push("signature");
        }
        if self.header.ephemeral_public_key.is_empty() {
            missing.push("header.ephemeralPublicKey");
        }
        missing
    }
}
