//! Token store - Access/refresh tokens, decoded claims, and change tracking
//!
//! [`AuthStore`] owns a single [`AuthState`] record. Reads come in two
//! forms: snapshot getters (`get_*`) for one-off reads, and `use_*` views
//! that follow a slice reactively. Writes go through the stable
//! [`AuthActions`] handle.
//!
//! # Example
//!
//! ```
//! use authstate_lib::auth::encode_unsigned;
//! use authstate_lib::store::AuthStore;
//! use serde_json::json;
//!
//! let store = AuthStore::in_memory();
//! let user_id = store.use_selector(|s| s.access_token_data.as_ref().map(|c| c.user_id.clone()));
//!
//! let token = encode_unsigned(&json!({"userId": "u1", "roles": ["user"]}));
//! store.actions().set_access_token(Some(&token));
//!
//! assert_eq!(user_id.get().as_deref(), Some("u1"));
//! assert_eq!(user_id.changes(), 1);
//! ```

mod actions;
mod devtools;
mod hooks;
mod state;
mod subscription;

pub use actions::AuthActions;
pub use devtools::{DevtoolsChannel, DevtoolsEvent};
pub use hooks::Selected;
pub use state::{selectors, AuthState};
pub use subscription::{Listener, Subscription};

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::auth::{ClaimsSchema, TokenClaims};
use crate::config::StoreConfig;
use crate::cookies::Cookies;
use crate::security::SecretToken;

use hooks::SelectedWriter;
use subscription::Listeners;

/// State and collaborators shared by the store and its action handles
pub(crate) struct StoreInner {
    config: StoreConfig,
    claims_schema: ClaimsSchema,
    cookies: Cookies,
    state: RwLock<AuthState>,
    listeners: Arc<Listeners>,
    devtools: Option<DevtoolsChannel>,
}

impl StoreInner {
    fn snapshot(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn select<T>(&self, selector: impl FnOnce(&AuthState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        selector(&state)
    }
}

/// Client-side authentication state store
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct AuthStore {
    actions: AuthActions,
}

impl AuthStore {
    /// Creates a store with all fields absent
    pub fn new(config: StoreConfig, cookies: Cookies) -> Self {
        let devtools = config
            .devtools_enabled()
            .then(|| DevtoolsChannel::new(config.devtools_name.clone(), config.devtools_capacity));

        tracing::debug!(
            "Creating auth store (devtools: {})",
            if devtools.is_some() { "on" } else { "off" }
        );

        let inner = StoreInner {
            claims_schema: config.claims_schema(),
            config,
            cookies,
            state: RwLock::new(AuthState::default()),
            listeners: Arc::new(Listeners::default()),
            devtools,
        };

        Self {
            actions: AuthActions::new(Arc::new(inner)),
        }
    }

    /// Creates a store over `cookies` with configuration from the environment
    pub fn with_cookies(cookies: Cookies) -> Self {
        Self::new(StoreConfig::from_env(), cookies)
    }

    /// Creates a store over fresh in-memory cookies
    pub fn in_memory() -> Self {
        Self::with_cookies(Cookies::in_memory())
    }

    fn inner(&self) -> &Arc<StoreInner> {
        self.actions.inner()
    }

    /// Returns the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.inner().config
    }

    /// Returns the cookie accessor the store reads from
    pub fn cookies(&self) -> &Cookies {
        &self.inner().cookies
    }

    /// Returns the devtools channel, absent in production
    pub fn devtools(&self) -> Option<&DevtoolsChannel> {
        self.inner().devtools.as_ref()
    }

    /// Returns the action handle; always the same handle for this store
    pub fn actions(&self) -> &AuthActions {
        &self.actions
    }

    // ========================================================================
    // Snapshot getters
    // ========================================================================

    /// Returns a copy of the whole state
    pub fn get_state(&self) -> AuthState {
        self.inner().snapshot()
    }

    /// Returns the current access token
    pub fn get_access_token(&self) -> Option<SecretToken> {
        self.inner().select(selectors::access_token)
    }

    /// Returns the claims decoded from the current access token
    pub fn get_access_token_data(&self) -> Option<TokenClaims> {
        self.inner().select(selectors::access_token_data)
    }

    /// Returns the current refresh token
    pub fn get_refresh_token(&self) -> Option<SecretToken> {
        self.inner().select(selectors::refresh_token)
    }

    /// Returns a clone of the action handle
    pub fn get_actions(&self) -> AuthActions {
        self.actions.clone()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Calls `listener` with `(next, previous)` after every transition
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthState, &AuthState) + Send + Sync + 'static,
    {
        self.inner().listeners.add(Arc::new(listener))
    }

    /// Calls `listener` with `(next, previous)` slice values when the slice
    /// selected by `selector` changes according to `equality`
    pub fn subscribe_with_selector<T, S, E, F>(
        &self,
        selector: S,
        equality: E,
        listener: F,
    ) -> Subscription
    where
        T: Send + 'static,
        S: Fn(&AuthState) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let last = Mutex::new(self.inner().select(&selector));
        let store = Arc::downgrade(self.inner());

        // A nested transition may already have been delivered, so `state`
        // can be stale; select from the live state instead.
        let current = move |state: &AuthState| match store.upgrade() {
            Some(inner) => inner.select(&selector),
            None => selector(state),
        };

        self.subscribe(move |state, _| {
            let next = current(state);
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if equality(&*last, &next) {
                return;
            }
            let previous = std::mem::replace(&mut *last, next);
            // Release before calling out so the listener may re-enter
            let next = current(state);
            drop(last);
            listener(&next, &previous);
        })
    }

    /// Number of registered listeners, including `use_*` views
    pub fn listener_count(&self) -> usize {
        self.inner().listeners.len()
    }

    // ========================================================================
    // Reactive views
    // ========================================================================

    /// Follows the slice selected by `selector`, compared with `PartialEq`
    pub fn use_selector<T, S>(&self, selector: S) -> Selected<T>
    where
        T: Clone + PartialEq + Send + 'static,
        S: Fn(&AuthState) -> T + Send + Sync + 'static,
    {
        self.use_selector_with(selector, |a: &T, b: &T| a == b)
    }

    /// Follows the slice selected by `selector`, compared with `equality`
    pub fn use_selector_with<T, S, E>(&self, selector: S, equality: E) -> Selected<T>
    where
        T: Clone + Send + 'static,
        S: Fn(&AuthState) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let writer = SelectedWriter::new(self.inner().select(&selector));
        let publisher = writer.clone();
        let subscription =
            self.subscribe_with_selector(selector, equality, move |next: &T, _: &T| {
                publisher.publish(next.clone())
            });
        writer.reader(subscription)
    }

    /// Follows the access token
    pub fn use_access_token(&self) -> Selected<Option<SecretToken>> {
        self.use_selector(selectors::access_token)
    }

    /// Follows the decoded access token claims
    pub fn use_access_token_data(&self) -> Selected<Option<TokenClaims>> {
        self.use_selector(selectors::access_token_data)
    }

    /// Follows the refresh token
    pub fn use_refresh_token(&self) -> Selected<Option<SecretToken>> {
        self.use_selector(selectors::refresh_token)
    }

    /// Returns the action handle; it never changes, so there is nothing to follow
    pub fn use_actions(&self) -> AuthActions {
        self.actions.clone()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &self.get_state())
            .field("listeners", &self.listener_count())
            .field("devtools", &self.devtools().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{encode_unsigned, Role};
    use crate::config::Environment;
    use crate::cookies::CookieAttributes;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dev_store() -> AuthStore {
        store_with(Cookies::in_memory())
    }

    fn store_with(cookies: Cookies) -> AuthStore {
        let config = StoreConfig::default().with_environment(Environment::Development);
        AuthStore::new(config, cookies)
    }

    fn token_for(user_id: &str, roles: &[&str]) -> String {
        encode_unsigned(&json!({"userId": user_id, "roles": roles}))
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = dev_store();
        assert!(store.get_state().is_empty());
        assert!(store.get_access_token().is_none());
        assert!(store.get_access_token_data().is_none());
        assert!(store.get_refresh_token().is_none());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_set_access_token_decodes_claims() {
        let store = dev_store();
        let token = token_for("u1", &["admin"]);

        store.actions().set_access_token(Some(&token));

        assert_eq!(store.get_access_token().unwrap(), token.as_str());
        let claims = store.get_access_token_data().unwrap();
        assert_eq!(claims, TokenClaims::new("u1", vec![Role::Admin]));
        assert!(store.get_state().is_authenticated());
    }

    #[test]
    fn test_set_access_token_keeps_undecodable_token() {
        let store = dev_store();
        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["user"])));

        store.actions().set_access_token(Some("not-a-jwt"));

        assert_eq!(store.get_access_token().unwrap(), "not-a-jwt");
        assert!(store.get_access_token_data().is_none());
    }

    #[test]
    fn test_set_access_token_none_clears_token_and_claims() {
        let store = dev_store();
        let actions = store.get_actions();
        actions.set_access_token(Some(&token_for("u1", &["user"])));
        actions.set_refresh_token(Some("refresh-1"));

        actions.set_access_token(None);

        assert!(store.get_access_token().is_none());
        assert!(store.get_access_token_data().is_none());
        assert_eq!(store.get_refresh_token().unwrap(), "refresh-1");
    }

    #[test]
    fn test_set_refresh_token_leaves_access_token() {
        let store = dev_store();
        let token = token_for("u2", &["user"]);
        store.actions().set_access_token(Some(&token));

        store.actions().set_refresh_token(Some("r1"));
        assert_eq!(store.get_refresh_token().unwrap(), "r1");
        assert_eq!(store.get_access_token().unwrap(), token.as_str());

        store.actions().set_refresh_token(None);
        assert!(store.get_refresh_token().is_none());
        assert!(store.get_access_token_data().is_some());
    }

    #[test]
    fn test_clear_tokens() {
        let store = dev_store();
        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["admin", "user"])));
        store.actions().set_refresh_token(Some("r1"));

        store.actions().clear_tokens();

        assert_eq!(store.get_state(), AuthState::default());
    }

    #[test]
    fn test_init_loads_tokens_from_cookies() {
        let cookies = Cookies::in_memory();
        let token = token_for("u1", &["user"]);
        cookies.set_raw("accessToken", &token, &CookieAttributes::new());
        cookies.set_raw("refreshToken", "123", &CookieAttributes::new());

        let store = store_with(cookies);
        store.actions().init();

        assert_eq!(store.get_access_token().unwrap(), token.as_str());
        assert_eq!(store.get_access_token_data().unwrap().user_id, "u1");
        // Raw read: a numeric-looking value is not parsed
        assert_eq!(store.get_refresh_token().unwrap(), "123");
    }

    #[test]
    fn test_init_without_cookies_leaves_state_empty() {
        let store = dev_store();
        store.actions().init();
        assert!(store.get_state().is_empty());
    }

    #[test]
    fn test_init_clears_tokens_missing_from_cookies() {
        let store = dev_store();
        store.actions().set_refresh_token(Some("stale"));
        store.actions().init();
        assert!(store.get_refresh_token().is_none());
    }

    #[test]
    fn test_init_uses_configured_cookie_names() {
        let cookies = Cookies::in_memory();
        cookies.set_raw("at", &token_for("u9", &["user"]), &CookieAttributes::new());
        cookies.set_raw("rt", "r9", &CookieAttributes::new());

        let config = StoreConfig::default().with_cookie_names("at", "rt");
        let store = AuthStore::new(config, cookies);
        store.actions().init();

        assert_eq!(store.get_access_token_data().unwrap().user_id, "u9");
        assert_eq!(store.get_refresh_token().unwrap(), "r9");
    }

    #[test]
    fn test_strict_claims_drop_extra_fields() {
        let config = StoreConfig::default().with_strict_claims(true);
        let store = AuthStore::new(config, Cookies::in_memory());
        let token = encode_unsigned(&json!({"userId": "u1", "roles": ["user"], "exp": 1}));

        store.actions().set_access_token(Some(&token));

        assert!(store.get_access_token().is_some());
        assert!(store.get_access_token_data().is_none());
    }

    #[test]
    fn test_subscribe_receives_next_and_previous() {
        let store = dev_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |next, previous| {
            sink.lock().unwrap().push((
                next.refresh_token.as_deref().map(str::to_string),
                previous.refresh_token.as_deref().map(str::to_string),
            ));
        });

        store.actions().set_refresh_token(Some("a"));
        store.actions().set_refresh_token(Some("b"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (Some("a".to_string()), None),
                (Some("b".to_string()), Some("a".to_string())),
            ]
        );
    }

    #[test]
    fn test_subscribe_notified_on_every_action() {
        let store = dev_store();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _sub = store.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.actions().clear_tokens();
        store.actions().clear_tokens();
        store.actions().set_refresh_token(None);

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = dev_store();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sub = store.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.actions().clear_tokens();
        assert!(sub.unsubscribe());
        store.actions().clear_tokens();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_subscribe_with_selector_skips_unchanged_slice() {
        let store = dev_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe_with_selector(
            |s| s.access_token_data.as_ref().map(|c| c.user_id.clone()),
            |a, b| a == b,
            move |next: &Option<String>, previous: &Option<String>| {
                sink.lock().unwrap().push((next.clone(), previous.clone()));
            },
        );

        store.actions().set_refresh_token(Some("r1"));
        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["user"])));
        // Same user, different roles: slice unchanged
        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["admin"])));
        store.actions().clear_tokens();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (Some("u1".to_string()), None),
                (None, Some("u1".to_string())),
            ]
        );
    }

    #[test]
    fn test_subscribe_with_custom_equality() {
        let store = dev_store();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        // Only presence matters
        let _sub = store.subscribe_with_selector(
            selectors::refresh_token,
            |a, b| a.is_some() == b.is_some(),
            move |_: &Option<SecretToken>, _: &Option<SecretToken>| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        store.actions().set_refresh_token(Some("a"));
        store.actions().set_refresh_token(Some("b"));
        store.actions().set_refresh_token(None);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_use_selector_tracks_changes() {
        let store = dev_store();
        let roles = store.use_selector(|s| {
            s.access_token_data
                .as_ref()
                .map(|c| c.roles.clone())
                .unwrap_or_default()
        });
        assert!(roles.get().is_empty());
        assert_eq!(roles.changes(), 0);

        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["user"])));
        assert_eq!(roles.get(), vec![Role::User]);
        assert_eq!(roles.changes(), 1);

        // Different user, same roles
        store
            .actions()
            .set_access_token(Some(&token_for("u2", &["user"])));
        assert_eq!(roles.changes(), 1);

        store.actions().set_refresh_token(Some("r"));
        assert_eq!(roles.changes(), 1);
    }

    #[test]
    fn test_use_selector_starts_from_current_state() {
        let store = dev_store();
        store.actions().set_refresh_token(Some("r1"));

        let refresh = store.use_refresh_token();
        assert_eq!(refresh.get().unwrap(), "r1");
        assert_eq!(refresh.changes(), 0);
    }

    #[test]
    fn test_use_token_views() {
        let store = dev_store();
        let access = store.use_access_token();
        let data = store.use_access_token_data();
        let refresh = store.use_refresh_token();

        let token = token_for("u1", &["admin"]);
        store.actions().set_access_token(Some(&token));

        assert_eq!(access.get().unwrap(), token.as_str());
        assert!(data.with(|d| d.as_ref().is_some_and(TokenClaims::is_admin)));
        assert_eq!(data.changes(), 1);
        assert!(refresh.get().is_none());
        assert_eq!(refresh.changes(), 0);

        store.actions().set_refresh_token(Some("r1"));
        assert_eq!(data.changes(), 1);
        assert_eq!(access.changes(), 1);
        assert_eq!(refresh.changes(), 1);

        store.actions().set_access_token(Some(&token));
        assert_eq!(data.changes(), 1);
        assert_eq!(access.changes(), 1);

        store
            .actions()
            .set_access_token(Some(&token_for("u2", &["user"])));
        assert_eq!(data.changes(), 2);
        assert_eq!(data.get().unwrap().user_id, "u2");
    }

    #[test]
    fn test_dropping_view_unsubscribes() {
        let store = dev_store();
        let view = store.use_access_token();
        assert_eq!(store.listener_count(), 1);
        drop(view);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_actions_handle_is_stable() {
        let store = dev_store();
        let first = store.get_actions();
        store.actions().set_refresh_token(Some("r1"));
        let second = store.use_actions();

        assert!(first.same_store(&second));
        assert!(first.same_store(store.actions()));
        assert!(!first.same_store(dev_store().actions()));
    }

    #[test]
    fn test_clones_share_state() {
        let store = dev_store();
        let other = store.clone();
        other.actions().set_refresh_token(Some("shared"));
        assert_eq!(store.get_refresh_token().unwrap(), "shared");
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let store = dev_store();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let _bad = store.subscribe(|_, _| panic!("subscriber failure"));
        let _good = store.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.actions().set_refresh_token(Some("r1"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_refresh_token().unwrap(), "r1");
    }

    #[test]
    fn test_listener_may_dispatch_actions() {
        let store = dev_store();
        let actions = store.get_actions();
        let _sub = store.subscribe(move |next, _| {
            if next.access_token.is_some() && next.refresh_token.is_none() {
                actions.set_refresh_token(Some("issued"));
            }
        });

        store
            .actions()
            .set_access_token(Some(&token_for("u1", &["user"])));

        assert_eq!(store.get_refresh_token().unwrap(), "issued");
    }

    #[test]
    fn test_view_follows_state_changed_by_earlier_listener() {
        let store = dev_store();
        let actions = store.get_actions();
        let _redirect = store.subscribe(move |next, _| {
            if next.access_token.as_deref() == Some("t1") {
                actions.set_access_token(Some("t2"));
            }
        });
        let view = store.use_access_token();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe_with_selector(
            selectors::access_token,
            |a, b| a == b,
            move |next: &Option<SecretToken>, _: &Option<SecretToken>| {
                sink.lock()
                    .unwrap()
                    .push(next.as_deref().map(str::to_string));
            },
        );

        store.actions().set_access_token(Some("t1"));

        assert_eq!(store.get_access_token().unwrap(), "t2");
        assert_eq!(view.get().unwrap(), "t2");
        assert_eq!(view.changes(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Some("t2".to_string())]);
    }

    #[test]
    fn test_devtools_receives_transitions_in_development() {
        let store = dev_store();
        let mut receiver = store.devtools().unwrap().subscribe();

        store.actions().set_refresh_token(Some("refresh-wxyz"));
        store.actions().clear_tokens();

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.store, "auth-store");
        assert_eq!(first.action, "setRefreshToken");
        assert_eq!(first.state["refreshToken"], "***wxyz");

        let second = receiver.try_recv().unwrap();
        assert_eq!(second.action, "clearTokens");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_init_reports_setter_actions() {
        let store = dev_store();
        let mut receiver = store.devtools().unwrap().subscribe();

        store.actions().init();

        assert_eq!(receiver.try_recv().unwrap().action, "setAccessToken");
        assert_eq!(receiver.try_recv().unwrap().action, "setRefreshToken");
    }

    #[test]
    fn test_devtools_with_oversized_capacity() {
        let mut config = StoreConfig::default().with_environment(Environment::Development);
        config.devtools_capacity = usize::MAX;
        let store = AuthStore::new(config, Cookies::in_memory());
        let mut receiver = store.devtools().unwrap().subscribe();

        store.actions().clear_tokens();
        assert_eq!(receiver.try_recv().unwrap().action, "clearTokens");
    }

    #[test]
    fn test_no_devtools_in_production() {
        let config = StoreConfig::default().with_environment(Environment::Production);
        let store = AuthStore::new(config, Cookies::in_memory());
        assert!(store.devtools().is_none());

        store.actions().set_refresh_token(Some("r1"));
        assert_eq!(store.get_refresh_token().unwrap(), "r1");
    }

    #[test]
    fn test_persist_writes_and_removes_cookies() {
        let cookies = Cookies::in_memory();
        let store = store_with(cookies.clone());
        let token = token_for("u1", &["user"]);
        let attributes = CookieAttributes::new().with_path("/");

        store.actions().set_access_token(Some(&token));
        store.actions().set_refresh_token(Some("r1"));
        // Setters never touch cookies on their own
        assert!(cookies.get_raw("accessToken").is_none());

        store.actions().persist(&attributes);
        assert_eq!(cookies.get_raw("accessToken").as_deref(), Some(token.as_str()));
        assert_eq!(cookies.get_raw("refreshToken").as_deref(), Some("r1"));

        store.actions().clear_tokens();
        store.actions().persist(&attributes);
        assert!(cookies.get_raw("accessToken").is_none());
        assert!(cookies.get_raw("refreshToken").is_none());
    }
}
