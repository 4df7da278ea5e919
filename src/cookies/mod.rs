//! Cookie module - Typed access to cookie storage
//!
//! Provides:
//! - [`Cookies`], the accessor with JSON decoding and schema validation
//! - [`CookieStorage`], the backend seam, and an in-memory jar
//! - [`CookieAttributes`] for writes and removals

mod accessor;
mod attributes;
mod storage;

pub use accessor::{CookieError, Cookies, GetOptions};
pub use attributes::{CookieAttributes, Expires, SameSite};
pub use storage::{CookieStorage, MemoryCookieStorage};
