//! Opaque handle tokens.
//!
//! A handle is a 128-bit random token rendered as 32 hex characters.
//! Tokens are minted once and never reused; the store treats them as
//! opaque strings.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An opaque token identifying a table in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(String);

impl Handle {
    /// Mints a fresh random handle.
    pub fn mint() -> Self {
        let token: u128 = rand::thread_rng().gen();
        Self(format!("{:032x}", token))
    }

    /// Wraps an existing token string.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Handle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mint_format() {
        let h = Handle::mint();
        assert_eq!(h.as_str().len(), 32);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_mint_uniqueness() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(Handle::mint()));
        }
    }

    #[test]
    fn test_round_trip_through_string() {
        let h = Handle::mint();
        let parsed: Handle = h.as_str().parse().unwrap();
        assert_eq!(parsed, h);
    }
}
