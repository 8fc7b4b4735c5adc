//! Secret handling.
//!
//! The provider access token is the only secret; it stays wrapped until the
//! moment it is written into a request header.

pub use secrecy::{ExposeSecret, SecretString};
