//! authstate - Client-side authentication token store
//!
//! Holds the access token, the claims decoded from it, and the refresh token
//! for a client session, with change notification and cookie persistence.
//!
//! ## Features
//!
//! - Decoding of unsigned JWT payloads into typed claims (no signature check)
//! - Snapshot getters and reactive `use_*` views with change counting
//! - Selector subscriptions that only fire when their slice changes
//! - Cookie accessor with JSON/raw reads, schema validation and attributes
//! - Devtools event channel outside production
//!
//! ## Architecture
//!
//! - **Store**: State record, actions, subscriptions, devtools
//! - **Auth**: Token claims and JWT payload decoding
//! - **Cookies**: Cookie accessor over a pluggable cookie storage
//! - **Schema**: Validation of untyped JSON into typed values
//! - **Security**: Token sanitization and zeroizing secrets

pub mod auth;
pub mod config;
pub mod cookies;
pub mod schema;
pub mod security;
pub mod store;

pub use auth::{Role, TokenClaims};
pub use config::{Environment, StoreConfig};
pub use cookies::{CookieAttributes, Cookies, GetOptions};
pub use store::{AuthActions, AuthState, AuthStore, Selected, Subscription};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`
///
/// Defaults to `authstate_lib=debug,info`. Does nothing if a global subscriber
/// is already set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("authstate_lib=debug,info"));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
