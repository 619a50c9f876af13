pub mod backoff;
pub mod nonce;
pub mod text;
pub mod validation;
