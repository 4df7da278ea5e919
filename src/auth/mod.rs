//! Authentication module - Access token claims and decoding
//!
//! Provides:
//! - The claims carried by an access token (`userId`, `roles`)
//! - Signature-less JWT payload decoding validated against the claims schema

mod claims;
mod jwt;

pub use claims::{ClaimsSchema, Role, TokenClaims};
pub use jwt::{
    decode_access_token, decode_access_token_with, decode_payload, encode_unsigned, DecodeError,
};
