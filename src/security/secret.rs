//! Access and refresh tokens as held by the store

use std::fmt;
use std::ops::Deref;

use zeroize::Zeroizing;

use super::Sanitizer;

/// A token held in [`AuthState`](crate::store::AuthState)
///
/// The buffer is wiped when the last copy is dropped. `Debug` prints the same
/// sanitized tail the store logs, and comparisons scan the whole token.
///
/// # Example
///
/// ```
/// use authstate_lib::security::SecretToken;
///
/// let token = SecretToken::from("header.payload.signature");
/// assert_eq!(token, "header.payload.signature");
/// assert_eq!(format!("{:?}", token), r#"SecretToken("***ture")"#);
/// ```
#[derive(Clone)]
pub struct SecretToken(Zeroizing<String>);

impl SecretToken {
    /// Returns the token in the form used for logs and devtools
    pub fn sanitized(&self) -> String {
        Sanitizer::sanitize_token(&self.0)
    }

    fn matches(&self, other: &[u8]) -> bool {
        let own = self.0.as_bytes();
        own.len() == other.len()
            && own
                .iter()
                .zip(other)
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

impl From<&str> for SecretToken {
    fn from(token: &str) -> Self {
        Self(Zeroizing::new(token.to_owned()))
    }
}

impl Deref for SecretToken {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretToken").field(&self.sanitized()).finish()
    }
}

impl PartialEq for SecretToken {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.0.as_bytes())
    }
}

impl Eq for SecretToken {}

impl PartialEq<&str> for SecretToken {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other.as_bytes())
    }
}
