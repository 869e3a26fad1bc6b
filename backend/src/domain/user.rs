//! User identity types.
//!
//! Users are owned by the user directory; purchases and consumption mappings
//! only reference them. A [`Username`] is the external handle callers supply,
//! a [`UserId`] is the stable numeric identity it resolves to.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 64;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameValidationError {
    /// Username is empty once trimmed.
    #[error("username must not be empty")]
    Empty,
    /// Username exceeds [`USERNAME_MAX`] characters.
    #[error("username must be at most {max} characters")]
    TooLong { max: usize },
    /// Username contains characters outside the permitted set.
    #[error("username may only contain letters, numbers, '.', '_' or '-'")]
    InvalidCharacters,
}

/// Stable numeric user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique, immutable user handle.
///
/// Surrounding whitespace is trimmed on construction.
///
/// # Examples
/// ```
/// use backend::domain::Username;
///
/// let name = Username::new("  alice ").expect("valid username");
/// assert_eq!(name.as_ref(), "alice");
/// assert!(Username::new("bob smith").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new("^[A-Za-z0-9._-]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(username: impl Into<String>) -> Result<Self, UsernameValidationError> {
        let raw = username.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UsernameValidationError::Empty);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(UsernameValidationError::TooLong { max: USERNAME_MAX });
        }
        if !username_regex().is_match(trimmed) {
            return Err(UsernameValidationError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Wrap a username read back from the user store, exactly as stored.
    ///
    /// Accounts are created outside this service, so stored handles are not
    /// held to the request-input rules of [`Username::new`].
    pub fn from_stored(username: String) -> Self {
        Self(username)
    }

    /// Borrow the username as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
