//! Access token claims and their schema

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{type_name, Schema, ValidationError};

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator
    Admin,
    /// Regular user
    User,
}

impl Role {
    /// Returns the wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Returns all roles
    pub fn all() -> &'static [Role] {
        &[Self::Admin, Self::User]
    }

    /// Parses a wire name into a role
    pub fn from_name(name: &str) -> Option<Role> {
        Self::all().iter().copied().find(|r| r.as_str() == name)
    }
}

/// Claims carried in the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Identifier of the authenticated user
    pub user_id: String,
    /// Roles granted to the user
    pub roles: Vec<Role>,
}

impl TokenClaims {
    /// Creates claims for a user
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    /// Returns true if the claims grant `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Returns true if the claims grant the admin role
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Schema for [`TokenClaims`]
///
/// `userId` must be a string and `roles` an array of known role names.
/// Extra payload fields (`exp`, `iat`, ...) are ignored unless the schema
/// is strict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimsSchema {
    strict: bool,
}

impl ClaimsSchema {
    const FIELDS: [&'static str; 2] = ["userId", "roles"];

    /// Creates a lenient schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema that rejects unknown fields
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Returns true if unknown fields are rejected
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn user_id(object: &Map<String, Value>) -> Result<String, ValidationError> {
        match object.get("userId") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(other) => Err(ValidationError::InvalidType {
                field: "userId".into(),
                expected: "string",
                found: type_name(other),
            }),
            None => Err(ValidationError::MissingField("userId".into())),
        }
    }

    fn roles(object: &Map<String, Value>) -> Result<Vec<Role>, ValidationError> {
        let items = match object.get("roles") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ValidationError::InvalidType {
                    field: "roles".into(),
                    expected: "array",
                    found: type_name(other),
                })
            }
            None => return Err(ValidationError::MissingField("roles".into())),
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let name = item.as_str().ok_or_else(|| ValidationError::InvalidType {
                    field: format!("roles[{}]", i),
                    expected: "string",
                    found: type_name(item),
                })?;
                Role::from_name(name).ok_or_else(|| {
                    ValidationError::Invalid(format!("roles[{}]: unknown role '{}'", i, name))
                })
            })
            .collect()
    }
}

impl Schema for ClaimsSchema {
    type Output = TokenClaims;

    fn validate(&self, raw: &Value) -> Result<TokenClaims, ValidationError> {
        let object = raw.as_object().ok_or_else(|| ValidationError::InvalidType {
            field: "payload".into(),
            expected: "object",
            found: type_name(raw),
        })?;

        if self.strict {
            if let Some(key) = object.keys().find(|k| !Self::FIELDS.contains(&k.as_str())) {
                return Err(ValidationError::UnknownField(key.clone()));
            }
        }

        Ok(TokenClaims {
            user_id: Self::user_id(object)?,
            roles: Self::roles(object)?,
        })
    }
}
