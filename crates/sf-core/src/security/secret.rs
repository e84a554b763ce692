use std::fmt;
use std::ops::Deref;
use zeroize::Zeroize;

/// A sensitive string (password, session token) that must never be logged or serialized.
///
/// - not `Clone`: hand it over explicitly or borrow it
/// - `Debug` / `Display` print `[REDACTED]`
/// - memory is zeroized on drop
pub struct SecretString {
    inner: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Borrow the secret. The only way to read it.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Explicit copy for the rare case where two owners are needed
    /// (for example a resend that replays the original registration payload).
    pub fn duplicate(&self) -> Self {
        Self::new(self.inner.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.chars().count()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Deref for SecretString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
