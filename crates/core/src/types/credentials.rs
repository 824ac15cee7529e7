//! Sign-up / sign-in credential types.
//!
//! The identity provider performs its own checks, but the registration
//! screen validates locally first so obviously bad input never costs a
//! network round trip.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating credentials.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The email is empty.
    #[error("email cannot be empty")]
    EmptyEmail,
    /// The email is longer than RFC 5321 allows.
    #[error("email must be at most {max} characters")]
    EmailTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The email does not contain an @ symbol.
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    /// Nothing before the @.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// Nothing after the @.
    #[error("email domain cannot be empty")]
    EmptyDomain,
    /// Password shorter than [`Password::MIN_LENGTH`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum required length.
        min: usize,
    },
}

/// A syntactically plausible email address.
///
/// ```
/// use tuckbox_core::Email;
///
/// assert!(Email::parse("diner@tuckbox.nz").is_ok());
/// assert!(Email::parse("no-at-symbol").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] describing the first rule violated.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CredentialError::EmptyEmail);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(CredentialError::EmailTooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(CredentialError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(CredentialError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(CredentialError::EmptyDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A password that satisfies the sign-up length rule.
///
/// Held as a [`SecretString`] so it never shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Password(SecretString);

impl Password {
    /// Minimum accepted password length, in characters.
    pub const MIN_LENGTH: usize = 6;

    /// Validate a candidate password.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::PasswordTooShort`] below the minimum length.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(CredentialError::PasswordTooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(SecretString::from(s.to_owned())))
    }

    /// Expose the raw password for transmission to the identity provider.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
