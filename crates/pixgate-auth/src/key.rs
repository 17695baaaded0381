//! The shared signing key.

use std::fmt;

/// Shared secret used as the HMAC key for signatures and body hashes.
///
/// The bytes are never printed; `Debug` shows a placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Build a key from an optional configuration value.
    ///
    /// An absent or empty value yields `None`, which disables signing.
    ///
    /// ```
    /// use pixgate_auth::SecretKey;
    ///
    /// assert!(SecretKey::from_config(None).is_none());
    /// assert!(SecretKey::from_config(Some("")).is_none());
    /// assert!(SecretKey::from_config(Some("secret")).is_some());
    /// ```
    #[must_use]
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        value.filter(|v| !v.is_empty()).map(Self::new)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_not_print_key_bytes() {
        let key = SecretKey::new("hunter2");
        assert_eq!(format!("{key:?}"), "SecretKey([REDACTED])");
    }

    #[test]
    fn test_should_keep_raw_bytes() {
        let key = SecretKey::new(vec![0u8, 1, 2]);
        assert_eq!(key.as_bytes(), &[0, 1, 2]);
    }
}
