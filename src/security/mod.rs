//! Security module - Token memory handling and log sanitization
//!
//! - Zeroizing token strings that never print their content
//! - Sanitizing tokens before they reach logs or devtools

mod sanitizer;
mod secret;

pub use sanitizer::Sanitizer;
pub use secret::SecretToken;
