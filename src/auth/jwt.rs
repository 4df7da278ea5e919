//! Access token decoding
//!
//! Reads the claims out of a JWT without checking its signature. Tokens are
//! issued and verified elsewhere; this side only needs the payload to know
//! who is signed in.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

use super::claims::{ClaimsSchema, TokenClaims};
use crate::schema::{Schema, ValidationError};

/// base64url that accepts payload segments with or without `=` padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors that can occur while decoding an access token
///
/// Callers normally treat every variant the same way ("no claims"); the
/// variants exist for log messages.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token does not have three dot-separated segments
    #[error("Invalid token format: expected 3 segments, found {0}")]
    Format(usize),

    /// The payload segment is not valid base64url
    #[error("Invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload is not valid JSON
    #[error("Invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload does not satisfy the claims schema
    #[error("Invalid claims: {0}")]
    Claims(#[from] ValidationError),
}

/// Decodes the payload segment of a JWT into a generic JSON value
pub fn decode_payload(token: &str) -> Result<Value, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Format(segments.len()));
    }

    let payload = URL_SAFE_LENIENT.decode(segments[1])?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Decodes an access token and validates its claims with `schema`
pub fn decode_access_token_with(
    token: &str,
    schema: &ClaimsSchema,
) -> Result<TokenClaims, DecodeError> {
    let payload = decode_payload(token)?;
    Ok(schema.validate(&payload)?)
}

/// Decodes an access token with the default (lenient) claims schema
///
/// # Example
///
/// ```
/// use authstate_lib::auth::{decode_access_token, Role};
///
/// // {"alg":"none"} . {"userId":"u1","roles":["admin"]} . (no signature)
/// let token = "eyJhbGciOiJub25lIn0.eyJ1c2VySWQiOiJ1MSIsInJvbGVzIjpbImFkbWluIl19.";
/// let claims = decode_access_token(token).unwrap();
/// assert_eq!(claims.user_id, "u1");
/// assert_eq!(claims.roles, vec![Role::Admin]);
///
/// assert!(decode_access_token("not-a-jwt").is_err());
/// ```
pub fn decode_access_token(token: &str) -> Result<TokenClaims, DecodeError> {
    decode_access_token_with(token, &ClaimsSchema::new())
}

/// Builds an unsigned token around `payload`
///
/// Test helper for callers that need well-formed tokens without an issuer.
pub fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_LENIENT.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_LENIENT.encode(payload.to_string());
    format!("{}.{}.", header, body)
}
