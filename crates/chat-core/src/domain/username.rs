//! Validated usernames.

use std::borrow::Borrow;
use std::fmt;

use crate::domain::error::ChatError;

/// A non-empty, whitespace-trimmed username.
///
/// The only way to build one is [`Username::parse`], so every `Username` in
/// the registry is already valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    /// Trims `raw` and rejects the result if it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyUsername`] when `raw` is empty or consists
    /// only of whitespace.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyUsername);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets registry maps keyed by `Username` be queried with a plain `&str`.
impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
