//! Apple Pay payment-token decryption (`EC_v1`).
//!
//! This module is intentionally free of HTTP and gateway dependencies. It turns
//! an [`EncryptedToken`](common::EncryptedToken) plus the merchant's
//! payment-processing key into a [`DecryptionOutcome`].
//!
//! # Scheme
//!
//! ```text
//! data      = base64( iv[16] || ciphertext || tag[16] )
//! Z         = ECDH-P256(merchant_key, header.ephemeralPublicKey)
//! key       = SHA-256( 00000001 || Z || 00000014 || "id-aes256-GCM" )
//! plaintext = AES-256-GCM-open(key, iv, ciphertext || tag)
//! ```
//!
//! The signature is carried through but not verified.

pub mod kdf;
pub mod key;
pub mod token;

#[cfg(test)]
pub(crate) mod fixtures;

pub use key::{KeyError, MerchantKey};
pub use token::{decrypt, decrypt_with, CardExpiry, DecryptError, DecryptedCardPayload, DecryptionOutcome};
