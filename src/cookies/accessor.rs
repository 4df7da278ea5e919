//! Typed access to cookie storage
//!
//! [`Cookies`] is a façade over a [`CookieStorage`] backend: raw reads,
//! optional JSON decoding, schema validation, and JSON-aware writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::attributes::CookieAttributes;
use super::storage::{CookieStorage, MemoryCookieStorage};
use crate::schema::{Schema, SerdeSchema, ValidationError};

/// Errors surfaced by the cookie accessor
#[derive(Debug, Error)]
pub enum CookieError {
    /// A cookie value does not satisfy the requested schema
    #[error("Cookie '{key}' failed validation: {source}")]
    Validation {
        key: String,
        #[source]
        source: ValidationError,
    },

    /// A value could not be serialized for writing
    #[error("Failed to serialize cookie '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read options for [`Cookies::get`] and [`Cookies::get_validated`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Attempt to parse the raw value as JSON
    pub parse_json: bool,
}

impl GetOptions {
    /// Return the raw string untouched
    pub fn raw() -> Self {
        Self { parse_json: false }
    }

    /// Parse the value as JSON, falling back to the raw string
    pub fn json() -> Self {
        Self { parse_json: true }
    }
}

/// Cookie accessor
///
/// Cheap to clone; clones share the same storage.
///
/// # Example
///
/// ```
/// use authstate_lib::cookies::{CookieAttributes, Cookies, GetOptions};
/// use serde_json::json;
///
/// let cookies = Cookies::in_memory();
/// cookies.set("prefs", &json!({"theme": "dark"}), &CookieAttributes::new()).unwrap();
///
/// assert_eq!(cookies.get_raw("prefs").as_deref(), Some(r#"{"theme":"dark"}"#));
/// assert_eq!(cookies.get("prefs", &GetOptions::json()), Some(json!({"theme": "dark"})));
/// ```
#[derive(Clone)]
pub struct Cookies {
    storage: Arc<dyn CookieStorage>,
}

impl Cookies {
    /// Creates an accessor over `storage`
    pub fn new(storage: Arc<dyn CookieStorage>) -> Self {
        Self { storage }
    }

    /// Creates an accessor over a fresh [`MemoryCookieStorage`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCookieStorage::new()))
    }

    /// Returns the underlying storage
    pub fn storage(&self) -> &Arc<dyn CookieStorage> {
        &self.storage
    }

    /// Reads the raw string value of `key`
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.storage.read(key)
    }

    /// Reads `key`, optionally decoding it as JSON
    ///
    /// Without `parse_json` the value is returned as a JSON string. With it,
    /// a value that is not valid JSON is also returned as a JSON string
    /// holding the raw text.
    pub fn get(&self, key: &str, options: &GetOptions) -> Option<Value> {
        self.get_raw(key).map(|raw| Self::decode(raw, options))
    }

    /// Reads `key` and validates it against `schema`
    ///
    /// A missing key is `Ok(None)`. A present value that does not satisfy the
    /// schema is an error.
    pub fn get_validated<S: Schema>(
        &self,
        key: &str,
        options: &GetOptions,
        schema: &S,
    ) -> Result<Option<S::Output>, CookieError> {
        let Some(value) = self.get(key, options) else {
            return Ok(None);
        };

        schema
            .validate(&value)
            .map(Some)
            .map_err(|source| CookieError::Validation {
                key: key.to_string(),
                source,
            })
    }

    /// Reads `key` as JSON and deserializes it into `T`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CookieError> {
        self.get_validated(key, &GetOptions::json(), &SerdeSchema::<T>::new())
    }

    /// Returns every cookie as name → raw value
    pub fn get_all(&self) -> BTreeMap<String, String> {
        self.storage.read_all()
    }

    /// Writes `value` under `key`
    ///
    /// Strings are stored verbatim; anything else is stored as JSON text.
    /// `None` and `()` serialize to JSON `null` and are stored as the text
    /// `null`; call [`Cookies::remove`] to clear a key instead.
    pub fn set<V>(&self, key: &str, value: &V, attributes: &CookieAttributes) -> Result<(), CookieError>
    where
        V: Serialize + ?Sized,
    {
        let encoded = serde_json::to_value(value).map_err(|source| CookieError::Serialize {
            key: key.to_string(),
            source,
        })?;

        let text = match encoded {
            Value::String(s) => s,
            other => other.to_string(),
        };

        self.set_raw(key, &text, attributes);
        Ok(())
    }

    /// Writes a raw string under `key`
    pub fn set_raw(&self, key: &str, value: &str, attributes: &CookieAttributes) {
        self.storage.write(key, value, attributes);
    }

    /// Removes `key`; removing a missing key is not an error
    pub fn remove(&self, key: &str, attributes: &CookieAttributes) {
        self.storage.delete(key, attributes);
    }

    fn decode(raw: String, options: &GetOptions) -> Value {
        if options.parse_json {
            match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(raw),
            }
        } else {
            Value::String(raw)
        }
    }
}

impl Default for Cookies {
    fn default() -> Self {
        Self::in_memory()
    }
}
