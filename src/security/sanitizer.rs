//! Token sanitization for secure logging
//!
//! Tokens and cookie values are credentials. Anything that ends up in a log
//! line or a devtools payload goes through [`Sanitizer`] first.

/// Sanitizer for sensitive data
pub struct Sanitizer;

impl Sanitizer {
    /// Sanitizes a token for safe logging
    ///
    /// Shows only the last 4 characters preceded by "***".
    ///
    /// # Examples
    ///
    /// ```
    /// use authstate_lib::security::Sanitizer;
    ///
    /// assert_eq!(Sanitizer::sanitize_token("eyJhbGciOi.eyJ1c2VySWQi.c2lnbmF0dXJl"), "***dXJl");
    /// assert_eq!(Sanitizer::sanitize_token("short"), "***hort");
    /// assert_eq!(Sanitizer::sanitize_token("abc"), "****");
    /// ```
    pub fn sanitize_token(token: &str) -> String {
        let count = token.chars().count();
        if count > 4 {
            let tail: String = token.chars().skip(count - 4).collect();
            format!("***{}", tail)
        } else {
            "****".to_string()
        }
    }

    /// Sanitizes an optional token, rendering absence as `<none>`
    pub fn sanitize_optional(token: Option<&str>) -> String {
        token
            .map(Self::sanitize_token)
            .unwrap_or_else(|| "<none>".to_string())
    }
}
