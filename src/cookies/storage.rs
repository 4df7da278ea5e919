//! Cookie storage backends
//!
//! [`CookieStorage`] is the seam between the accessor and wherever cookies
//! actually live. [`MemoryCookieStorage`] keeps them in a `cookie::CookieJar`
//! and can import a `Cookie:` header and export `Set-Cookie` lines.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use cookie::{Cookie, CookieJar};

use super::attributes::CookieAttributes;

/// Abstraction for cookie storage backends
///
/// Values are raw strings. Reads of missing names return `None`, and
/// deleting a missing name is a no-op.
pub trait CookieStorage: Send + Sync {
    /// Reads the raw value of a cookie
    fn read(&self, name: &str) -> Option<String>;

    /// Reads every cookie as name → raw value
    fn read_all(&self) -> BTreeMap<String, String>;

    /// Writes a cookie with the given attributes
    fn write(&self, name: &str, value: &str, attributes: &CookieAttributes);

    /// Deletes a cookie; `attributes` must match the path/domain it was written with
    fn delete(&self, name: &str, attributes: &CookieAttributes);
}

#[derive(Default)]
struct JarState {
    jar: CookieJar,
    /// Opaque attributes per cookie name, appended to `Set-Cookie` output
    extras: BTreeMap<String, BTreeMap<String, String>>,
}

/// In-process cookie storage backed by `cookie::CookieJar`
///
/// # Example
///
/// ```
/// use authstate_lib::cookies::{CookieAttributes, CookieStorage, MemoryCookieStorage};
///
/// let storage = MemoryCookieStorage::from_cookie_header("accessToken=abc; theme=dark");
/// assert_eq!(storage.read("theme"), Some("dark".to_string()));
///
/// storage.write("refreshToken", "r1", &CookieAttributes::new().with_path("/"));
/// assert!(storage.set_cookie_headers().iter().any(|h| h.starts_with("refreshToken=r1")));
/// ```
#[derive(Default)]
pub struct MemoryCookieStorage {
    state: RwLock<JarState>,
}

impl MemoryCookieStorage {
    /// Creates an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage seeded from a `Cookie:` request header value
    ///
    /// Pairs are percent-decoded. Malformed pairs are skipped.
    pub fn from_cookie_header(header: &str) -> Self {
        let mut state = JarState::default();
        for parsed in Cookie::split_parse_encoded(header.to_string()) {
            match parsed {
                Ok(cookie) => state.jar.add_original(cookie.into_owned()),
                Err(e) => tracing::debug!("Skipping malformed cookie pair: {}", e),
            }
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Renders the current cookies as a `Cookie:` header value
    pub fn cookie_header(&self) -> String {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .jar
            .iter()
            .map(|c| c.encoded().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Renders every change since creation as `Set-Cookie` header values
    ///
    /// Removed cookies appear as removal cookies (empty value, `Max-Age=0`).
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .jar
            .delta()
            .map(|c| {
                let mut line = c.encoded().to_string();
                if let Some(extra) = state.extras.get(c.name()) {
                    for (key, value) in extra {
                        if value.is_empty() {
                            line.push_str(&format!("; {}", key));
                        } else {
                            line.push_str(&format!("; {}={}", key, value));
                        }
                    }
                }
                line
            })
            .collect()
    }

    /// Returns the opaque attributes last written for `name`
    pub fn extra_attributes(&self, name: &str) -> BTreeMap<String, String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.extras.get(name).cloned().unwrap_or_default()
    }

    /// Returns the number of live cookies
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.jar.iter().count()
    }

    /// Returns true if no cookies are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStorage for MemoryCookieStorage {
    fn read(&self, name: &str) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.jar.get(name).map(|c| c.value().to_string())
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .jar
            .iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect()
    }

    fn write(&self, name: &str, value: &str, attributes: &CookieAttributes) {
        let cookie = attributes.to_cookie(name, value, Utc::now());
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.jar.add(cookie);
        if attributes.extra.is_empty() {
            state.extras.remove(name);
        } else {
            state
                .extras
                .insert(name.to_string(), attributes.extra.clone());
        }
    }

    fn delete(&self, name: &str, attributes: &CookieAttributes) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.jar.get(name).is_none() {
            return;
        }
        let removal = CookieAttributes {
            expires: None,
            extra: BTreeMap::new(),
            ..attributes.clone()
        }
        .to_cookie(name, "", Utc::now());
        state.jar.remove(removal);
        state.extras.remove(name);
    }
}
