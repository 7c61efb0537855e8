//! Single-round concatenation KDF used by `EC_v1` tokens.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Byte length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Algorithm identifier mixed into the KDF input.
pub const ALGORITHM_ID: &[u8] = b"id-aes256-GCM";

/// Value of the 4-byte algorithm-identifier length field.
///
/// Fixed at 20 regardless of [`ALGORITHM_ID`]'s actual length; tokens are
/// sealed with exactly this layout, so it must not be "corrected".
const ALGORITHM_ID_LENGTH_FIELD: u32 = 20;

const COUNTER: u32 = 1;

/// Derive the symmetric key from the ECDH shared secret `z`.
///
/// Computes `SHA-256(counter || z || algorithm_id_length || algorithm_id)`
/// with both integers encoded as 4-byte big-endian.
pub fn derive_symmetric_key(z: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut hasher = Sha256::new();
    hasher.update(COUNTER.to_be_bytes());
    hasher.update(z);
    hasher.update(ALGORITHM_ID_LENGTH_FIELD.to_be_bytes());
    hasher.update(ALGORITHM_ID);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&hasher.finalize());
    key
}
