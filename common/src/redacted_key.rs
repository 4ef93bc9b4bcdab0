//! Secure credential handling with redacted Debug output.

use std::fmt;

use zeroize::Zeroize;

/// A verify key or session key that never exposes its value in logs or
/// debug output.
#[derive(Clone)]
pub struct RedactedKey {
    inner: String,
}

impl RedactedKey {
    /// Wrap a credential.
    pub fn new(key: impl Into<String>) -> Self {
        Self { inner: key.into() }
    }

    /// Get the actual value for transmission.
    ///
    /// # Security Note
    /// Only call this when building the connection address.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Credential length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<&str> for RedactedKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RedactedKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for RedactedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedKey([REDACTED])")
    }
}

impl fmt::Display for RedactedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED KEY]")
    }
}

impl Drop for RedactedKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
