//! # Secret Values
//!
//! Opaque container for cached keys.
//!
//! The value is zeroed when dropped and is never rendered by `Debug` or
//! `Display`, so a `SecretValue` can travel through structured logging fields
//! and error messages without leaking. Read it with [`SecretValue::expose_secret`]
//! at the point of use only.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string with redacted formatting and zero-on-drop memory
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret. Use immediately; do not log or persist.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED; {} bytes]", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretValue::from("sk_live_abc");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("sk_live_abc"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("11"));
    }

    #[test]
    fn test_display_is_redacted() {
        let secret = SecretValue::from("AIzaSyExample".to_string());
        assert_eq!(secret.to_string(), "[REDACTED; 13 bytes]");
    }

    #[test]
    fn test_expose_secret_returns_value() {
        let secret = SecretValue::new("value");
        assert_eq!(secret.expose_secret(), "value");
        assert_eq!(secret.len(), 5);
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_zeroize_clears_value() {
        let mut secret = SecretValue::from("to-be-wiped");
        secret.zeroize();
        assert!(secret.is_empty());
    }
}
