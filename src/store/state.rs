//! The auth state record and its selectors

use serde_json::{json, Value};

use crate::auth::TokenClaims;
use crate::security::SecretToken;

/// Authentication state held by the store
///
/// `access_token_data` is only ever set together with `access_token`, and
/// only when the token decoded and validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Raw access token
    pub access_token: Option<SecretToken>,
    /// Claims decoded from the access token
    pub access_token_data: Option<TokenClaims>,
    /// Raw refresh token
    pub refresh_token: Option<SecretToken>,
}

impl AuthState {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.access_token_data.is_none()
            && self.refresh_token.is_none()
    }

    /// Returns true if there are decoded claims for the current access token
    pub fn is_authenticated(&self) -> bool {
        self.access_token_data.is_some()
    }

    /// JSON view of the state with tokens sanitized, for logs and devtools
    pub fn redacted(&self) -> Value {
        json!({
            "accessToken": self.access_token.as_ref().map(SecretToken::sanitized),
            "accessTokenData": self.access_token_data,
            "refreshToken": self.refresh_token.as_ref().map(SecretToken::sanitized),
        })
    }
}

/// Selectors mapping the full state to a slice
pub mod selectors {
    use super::AuthState;
    use crate::auth::TokenClaims;
    use crate::security::SecretToken;

    /// Selects the access token
    pub fn access_token(state: &AuthState) -> Option<SecretToken> {
        state.access_token.clone()
    }

    /// Selects the decoded access token claims
    pub fn access_token_data(state: &AuthState) -> Option<TokenClaims> {
        state.access_token_data.clone()
    }

    /// Selects the refresh token
    pub fn refresh_token(state: &AuthState) -> Option<SecretToken> {
        state.refresh_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn populated() -> AuthState {
        AuthState {
            access_token: Some(SecretToken::from("header.payload.signature")),
            access_token_data: Some(TokenClaims::new("u1", vec![Role::User])),
            refresh_token: Some(SecretToken::from("refresh-token-r1")),
        }
    }

    #[test]
    fn test_default_is_empty() {
        let state = AuthState::default();
        assert!(state.is_empty());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_populated() {
        let state = populated();
        assert!(!state.is_empty());
        assert!(state.is_authenticated());
    }

    #[test]
    fn test_redacted_hides_tokens() {
        let value = populated().redacted();
        assert_eq!(value["accessToken"], "***ture");
        assert_eq!(value["refreshToken"], "***n-r1");
        assert_eq!(value["accessTokenData"]["userId"], "u1");

        let text = value.to_string();
        assert!(!text.contains("payload"));
    }

    #[test]
    fn test_redacted_empty() {
        let value = AuthState::default().redacted();
        assert!(value["accessToken"].is_null());
        assert!(value["accessTokenData"].is_null());
        assert!(value["refreshToken"].is_null());
    }

    #[test]
    fn test_selectors() {
        let state = populated();
        assert_eq!(
            selectors::access_token(&state).as_deref(),
            Some("header.payload.signature")
        );
        assert_eq!(
            selectors::access_token_data(&state).map(|c| c.user_id),
            Some("u1".to_string())
        );
        assert_eq!(
            selectors::refresh_token(&state).as_deref(),
            Some("refresh-token-r1")
        );
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let debug = format!("{:?}", populated());
        assert!(!debug.contains("header.payload.signature"));
        assert!(!debug.contains("refresh-token-r1"));
    }
}
