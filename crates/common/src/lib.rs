//! Common types, protocol definitions, and errors shared across `applepay-checkout` crates.

pub mod error;
pub mod protocol;
pub mod token;

pub use error::ServiceError;
pub use token::{EncryptedToken, TokenHeader};
