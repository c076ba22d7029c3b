//! JWT minting/verification and HTTP auth middleware support.

pub mod jwt;

pub use jwt::{build_claims, Claims, HmacTokenCodec, TokenCodec};
