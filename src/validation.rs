//! Input validation shared by the HTTP handlers.
//!
//! Validation failures carry the short `error` summary and optional `details`
//! that end up in the JSON failure envelope.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Validation error with a user-facing summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub error: String,
    pub details: Option<String>,
}

impl ValidationError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Required fields are absent; `expected` lists what the caller must send.
    pub fn missing_fields(expected: &str) -> Self {
        Self::new("Données manquantes").with_details(format!("Envoyez {}", expected))
    }

    pub fn invalid_email() -> Self {
        Self::new("Email invalide")
    }

    pub fn invalid_cc(cc: &str) -> Self {
        Self::new("Adresse email CC invalide").with_details(format!("cc = {}", cc))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Loose address check: something@something.tld with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Returns the value when it is a non-empty string.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Validate the recipient and the optional CC address.
pub fn validate_recipients(email: &str, cc: Option<&str>) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::invalid_email());
    }
    if let Some(cc) = cc {
        if !is_valid_email(cc) {
            return Err(ValidationError::invalid_cc(cc));
        }
    }
    Ok(())
}
