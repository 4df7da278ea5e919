//! Configuration for the auth store
//!
//! Cookie key names, build environment, devtools channel settings and the
//! claims schema mode. Loads from and saves to JSON; missing fields fall
//! back to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::ClaimsSchema;

/// Environment variable that overrides the build environment
pub const ENV_VAR: &str = "AUTHSTATE_ENV";

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build environment; devtools are only active outside production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development build, transitions go to the devtools channel
    Development,
    /// Production build, devtools disabled
    Production,
}

impl Environment {
    /// Environment implied by the build profile
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Parses an environment name (`development`/`dev`, `production`/`prod`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Returns true for production
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::current()
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cookie holding the access token
    pub access_token_cookie: String,
    /// Cookie holding the refresh token
    pub refresh_token_cookie: String,
    /// Build environment
    pub environment: Environment,
    /// Name tag of the devtools channel
    pub devtools_name: String,
    /// Events buffered per devtools receiver before old ones are dropped
    pub devtools_capacity: usize,
    /// Reject access tokens whose payload has fields beyond the claims
    pub strict_claims: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_token_cookie: "accessToken".to_string(),
            refresh_token_cookie: "refreshToken".to_string(),
            environment: Environment::current(),
            devtools_name: "auth-store".to_string(),
            devtools_capacity: 64,
            strict_claims: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration with the environment taken from `AUTHSTATE_ENV`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var(ENV_VAR) {
            match Environment::from_name(&name) {
                Some(environment) => config.environment = environment,
                None => tracing::warn!("Ignoring unknown {} value: {}", ENV_VAR, name),
            }
        }
        config
    }

    /// Loads configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads configuration from a JSON file, falling back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Saves configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Sets the environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the cookie names for the access and refresh tokens
    pub fn with_cookie_names(
        mut self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.access_token_cookie = access_token.into();
        self.refresh_token_cookie = refresh_token.into();
        self
    }

    /// Enables or disables strict claims validation
    pub fn with_strict_claims(mut self, strict: bool) -> Self {
        self.strict_claims = strict;
        self
    }

    /// Returns true if transitions should go to the devtools channel
    pub fn devtools_enabled(&self) -> bool {
        !self.environment.is_production()
    }

    /// Returns the claims schema selected by this configuration
    pub fn claims_schema(&self) -> ClaimsSchema {
        if self.strict_claims {
            ClaimsSchema::strict()
        } else {
            ClaimsSchema::new()
        }
    }
}
