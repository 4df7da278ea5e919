//! Structural validation of loosely-typed JSON values
//!
//! A [`Schema`] turns an untyped `serde_json::Value` into a typed value or
//! rejects it with a [`ValidationError`]. The cookie accessor uses it for
//! `get_validated`, and the claims decoder uses it for token payloads.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Error returned when a value does not have the required shape
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field required by the schema is missing
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A value has the wrong JSON type
    #[error("Invalid type for {field}: expected {expected}, found {found}")]
    InvalidType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A field is present that a strict schema does not allow
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Any other mismatch, with a free-form message
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// A structural contract a JSON value can be checked against
pub trait Schema {
    /// The typed value produced by a successful validation
    type Output;

    /// Validates `raw`, returning the typed value on success
    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationError>;
}

impl<F, T> Schema for F
where
    F: Fn(&Value) -> Result<T, ValidationError>,
{
    type Output = T;

    fn validate(&self, raw: &Value) -> Result<T, ValidationError> {
        self(raw)
    }
}

/// Schema backed by a type's `Deserialize` implementation
///
/// # Example
///
/// ```
/// use authstate_lib::schema::{Schema, SerdeSchema};
///
/// let schema = SerdeSchema::<Vec<u32>>::new();
/// assert_eq!(schema.validate(&serde_json::json!([1, 2])).unwrap(), vec![1, 2]);
/// assert!(schema.validate(&serde_json::json!("nope")).is_err());
/// ```
pub struct SerdeSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    /// Creates a schema for `T`
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Schema for SerdeSchema<T> {
    type Output = T;

    fn validate(&self, raw: &Value) -> Result<T, ValidationError> {
        T::deserialize(raw).map_err(|e| ValidationError::Invalid(e.to_string()))
    }
}

/// Returns the JSON type name of a value, for error messages
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
