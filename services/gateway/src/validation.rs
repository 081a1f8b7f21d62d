//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::FieldError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 50;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email".to_string());
    }

    Ok(())
}

/// Validate password
///
/// Strength rules are owned by upstream; the gateway only rejects passwords
/// that can never be valid.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }

    Ok(())
}

/// Validate a first or last name
pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();

    if len == 0 {
        return Err("Name must contain at least 1 character".to_string());
    }

    if len > MAX_NAME_LEN {
        return Err(format!(
            "Name must contain at most {} characters",
            MAX_NAME_LEN
        ));
    }

    Ok(())
}

/// Collects field errors so every problem is reported at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a required field, returning its value when present and valid
    pub fn field<'a>(
        &mut self,
        name: &str,
        value: Option<&'a str>,
        check: fn(&str) -> Result<(), String>,
    ) -> Option<&'a str> {
        let Some(value) = value else {
            self.errors.push(FieldError::new(name, "Required"));
            return None;
        };

        match check(value) {
            Ok(()) => Some(value),
            Err(message) => {
                self.errors.push(FieldError::new(name, message));
                None
            }
        }
    }

    /// Finish validation, yielding the errors if any were collected
    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
