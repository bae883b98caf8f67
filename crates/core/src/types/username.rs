//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// Shorter than [`Username::MIN_LENGTH`] characters after trimming.
    #[error("username must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than [`Username::MAX_LENGTH`] characters.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains control characters.
    #[error("username cannot contain control characters")]
    InvalidCharacter,
}

/// A display name chosen at registration, unique across users.
///
/// Length is counted in characters, not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 2;
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 150;

    /// Parse a `Username`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`UsernameError`] if the trimmed input is out of bounds or
    /// contains control characters.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let s = s.trim();
        let len = s.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_control) {
            return Err(UsernameError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Username` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
