//! [`Credentials`]: immutable bundle of loaded key and certificate material.

use std::sync::Arc;

use crate::crypto::MerchantKey;

/// PEM text of the merchant identity certificate and its private key, used
/// for mutual TLS towards Apple's merchant-validation endpoint.
#[derive(Clone)]
pub struct MerchantIdentity {
    cert_pem: String,
    key_pem: String,
}

impl MerchantIdentity {
    pub fn new(cert_pem: String, key_pem: String) -> Self {
        Self { cert_pem, key_pem }
    }

    /// Certificate chain followed by the key, the layout `reqwest::Identity::from_pem` expects.
    pub fn combined_pem(&self) -> Vec<u8> {
        let mut pem = self.cert_pem.trim_end().to_owned();
        pem.push('\n');
        pem.push_str(self.key_pem.trim_end());
        pem.push('\n');
        pem.into_bytes()
    }
}

impl std::fmt::Debug for MerchantIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MerchantIdentity([REDACTED])")
    }
}

/// Everything loaded at startup. Cheap to clone; never mutated.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    apple_pay_key: Option<Arc<MerchantKey>>,
    merchant_identity: Option<Arc<MerchantIdentity>>,
    merchant_id_cert_found: bool,
    merchant_id_key_found: bool,
}

impl Credentials {
    pub fn new(
        apple_pay_key: Option<Arc<MerchantKey>>,
        merchant_identity: Option<MerchantIdentity>,
    ) -> Self {
        let complete = merchant_identity.is_some();
        Self {
            apple_pay_key,
            merchant_identity: merchant_identity.map(Arc::new),
            merchant_id_cert_found: complete,
            merchant_id_key_found: complete,
        }
    }

    /// Record which halves of the merchant identity were found, even when the
    /// identity itself is incomplete.
    pub fn with_identity_parts(mut self, cert_found: bool, key_found: bool) -> Self {
        self.merchant_id_cert_found = cert_found;
        self.merchant_id_key_found = key_found;
        self
    }

    /// The payment-processing key, if loaded.
    pub fn apple_pay_key(&self) -> Option<&Arc<MerchantKey>> {
        self.apple_pay_key.as_ref()
    }

    pub fn merchant_identity(&self) -> Option<&Arc<MerchantIdentity>> {
        self.merchant_identity.as_ref()
    }

    pub fn merchant_id_cert_found(&self) -> bool {
        self.merchant_id_cert_found
    }

    pub fn merchant_id_key_found(&self) -> bool {
        self.merchant_id_key_found
    }
}
