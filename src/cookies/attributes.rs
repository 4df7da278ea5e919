//! Cookie write/removal attributes
//!
//! The accessor forwards these untouched to the storage backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use cookie::time::OffsetDateTime;
use cookie::Cookie;
use serde::{Deserialize, Serialize};

/// When a cookie expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expires {
    /// Expires this many days after it is written
    Days(i64),
    /// Expires at a fixed instant
    At(DateTime<Utc>),
}

impl Expires {
    /// Resolves the expiry to an absolute instant relative to `now`
    ///
    /// Returns `None` when the day count does not fit in a date.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Days(days) => {
                Duration::try_days(*days).and_then(|delta| now.checked_add_signed(delta))
            }
            Self::At(at) => Some(*at),
        }
    }
}

/// SameSite policy of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Only sent on same-site requests
    Strict,
    /// Sent on same-site requests and top-level navigations
    Lax,
    /// Always sent (requires `secure`)
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// Attributes attached to a cookie write or removal
///
/// Every field is optional. `extra` carries attributes this crate does not
/// model (for example `Partitioned` or `Priority`).
///
/// # Example
///
/// ```
/// use authstate_lib::cookies::{CookieAttributes, SameSite};
///
/// let attributes = CookieAttributes::new()
///     .with_expires_in_days(7)
///     .with_path("/")
///     .with_secure(true)
///     .with_same_site(SameSite::Strict);
/// assert_eq!(attributes.path.as_deref(), Some("/"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieAttributes {
    /// Expiry, a session cookie when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Expires>,
    /// Path scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Domain scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Only sent over secure transports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// SameSite policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    /// Hidden from scripts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Additional opaque attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CookieAttributes {
    /// Creates an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires `days` days after the write
    pub fn with_expires_in_days(mut self, days: i64) -> Self {
        self.expires = Some(Expires::Days(days));
        self
    }

    /// Expires at a fixed instant
    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(Expires::At(at));
        self
    }

    /// Sets the path scope
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the domain scope
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Sets the SameSite policy
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Sets the HttpOnly flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Adds an opaque attribute
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Builds a `cookie::Cookie` carrying these attributes
    ///
    /// `extra` is not representable on `cookie::Cookie`; storage backends
    /// that care about it read it from `self` directly.
    pub fn to_cookie(&self, name: &str, value: &str, now: DateTime<Utc>) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value.to_string()));

        if let Some(expires) = self.expires {
            let at = expires
                .resolve(now)
                .and_then(|at| OffsetDateTime::from_unix_timestamp(at.timestamp()).ok());
            match at {
                Some(at) => builder = builder.expires(at),
                None => tracing::warn!("Dropping out-of-range expiry on cookie {}", name),
            }
        }
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(secure) = self.secure {
            builder = builder.secure(secure);
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site.into());
        }
        if let Some(http_only) = self.http_only {
            builder = builder.http_only(http_only);
        }

        builder.build()
    }
}
