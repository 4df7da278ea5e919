//! The store's action set
//!
//! All mutation goes through [`AuthActions`]. Each action computes the next
//! state under the state lock, replaces it in one step, then notifies
//! devtools and listeners.

use std::sync::{Arc, PoisonError};

use crate::auth::decode_access_token_with;
use crate::cookies::CookieAttributes;
use crate::security::{Sanitizer, SecretToken};

use super::state::AuthState;
use super::StoreInner;

/// Stable handle to the store's actions
///
/// Cheap to clone. Every handle obtained from the same store drives the same
/// state; [`AuthActions::same_store`] tells whether two handles do.
#[derive(Clone)]
pub struct AuthActions {
    inner: Arc<StoreInner>,
}

impl AuthActions {
    pub(crate) fn new(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<StoreInner> {
        &self.inner
    }

    /// Returns true if both handles act on the same store
    pub fn same_store(&self, other: &AuthActions) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Sets the access token and the claims decoded from it
    ///
    /// `None` clears both. A token that does not decode is kept, but its
    /// claims are cleared and the failure is logged.
    pub fn set_access_token(&self, token: Option<&str>) {
        let Some(token) = token else {
            self.apply("setAccessToken", |state| AuthState {
                access_token: None,
                access_token_data: None,
                ..state.clone()
            });
            return;
        };

        let claims = match decode_access_token_with(token, &self.inner.claims_schema) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(
                    "Failed to decode access token {}: {}",
                    Sanitizer::sanitize_token(token),
                    e
                );
                None
            }
        };

        self.apply("setAccessToken", |state| AuthState {
            access_token: Some(SecretToken::from(token)),
            access_token_data: claims,
            ..state.clone()
        });
    }

    /// Sets the refresh token
    pub fn set_refresh_token(&self, token: Option<&str>) {
        self.apply("setRefreshToken", |state| AuthState {
            refresh_token: token.map(SecretToken::from),
            ..state.clone()
        });
    }

    /// Loads both tokens from their cookies
    ///
    /// Safe to call more than once; each call re-applies whatever the cookies
    /// currently hold.
    pub fn init(&self) {
        let config = &self.inner.config;
        let access_token = self.inner.cookies.get_raw(&config.access_token_cookie);
        let refresh_token = self.inner.cookies.get_raw(&config.refresh_token_cookie);

        tracing::debug!(
            "Initializing auth state from cookies (access: {}, refresh: {})",
            Sanitizer::sanitize_optional(access_token.as_deref()),
            Sanitizer::sanitize_optional(refresh_token.as_deref())
        );

        self.set_access_token(access_token.as_deref());
        self.set_refresh_token(refresh_token.as_deref());
    }

    /// Clears every token and the claims
    pub fn clear_tokens(&self) {
        self.apply("clearTokens", |_| AuthState::default());
    }

    /// Writes the current tokens to their cookies
    ///
    /// Absent tokens are removed. This is never done implicitly by the
    /// setters.
    pub fn persist(&self, attributes: &CookieAttributes) {
        let state = self.inner.snapshot();
        let config = &self.inner.config;
        let cookies = &self.inner.cookies;

        for (name, token) in [
            (&config.access_token_cookie, &state.access_token),
            (&config.refresh_token_cookie, &state.refresh_token),
        ] {
            match token {
                Some(token) => cookies.set_raw(name, token, attributes),
                None => cookies.remove(name, attributes),
            }
        }

        tracing::debug!("Persisted auth tokens to cookies");
    }

    fn apply(&self, action: &'static str, update: impl FnOnce(&AuthState) -> AuthState) {
        let (previous, next) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let next = update(&state);
            let previous = std::mem::replace(&mut *state, next.clone());
            (previous, next)
        };

        tracing::debug!(
            action,
            authenticated = next.is_authenticated(),
            "Auth state transition"
        );

        if let Some(devtools) = &self.inner.devtools {
            devtools.emit(action, &next);
        }
        self.inner.listeners.notify(&next, &previous);
    }
}

impl std::fmt::Debug for AuthActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthActions")
            .field("store", &Arc::as_ptr(&self.inner))
            .finish()
    }
}
