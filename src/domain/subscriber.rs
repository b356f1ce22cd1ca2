//! Newsletter subscriber addresses.

use std::fmt;

use validator::ValidateEmail;

use super::error::DomainError;

/// Longest address accepted, per the SMTP forward-path limit.
const MAX_EMAIL_LEN: usize = 254;

/// A validated, normalised email address.
///
/// Normalisation trims surrounding whitespace and lower-cases the address, so
/// `Reader@Example.com ` and `reader@example.com` land on the same set member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("email", "must not be empty"));
        }
        if trimmed.chars().count() > MAX_EMAIL_LEN {
            return Err(DomainError::validation(
                "email",
                format!("must be at most {MAX_EMAIL_LEN} characters"),
            ));
        }

        let normalised = trimmed.to_lowercase();
        if !normalised.validate_email() {
            return Err(DomainError::validation(
                "email",
                format!("`{trimmed}` is not a valid email address"),
            ));
        }

        Ok(Self(normalised))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
