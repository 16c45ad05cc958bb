use chrono::Duration;
use serde::Deserialize;
use std::fmt;

/// A single password rule that a candidate password broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    TooShort(usize),
    Digit,
    Lowercase,
    Uppercase,
    NonAlphanumeric,
}

impl fmt::Display for PasswordRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRequirement::TooShort(length) => {
                write!(f, "Passwords must be at least {} characters.", length)
            }
            PasswordRequirement::Digit => {
                f.write_str("Passwords must have at least one digit ('0'-'9').")
            }
            PasswordRequirement::Lowercase => {
                f.write_str("Passwords must have at least one lowercase ('a'-'z').")
            }
            PasswordRequirement::Uppercase => {
                f.write_str("Passwords must have at least one uppercase ('A'-'Z').")
            }
            PasswordRequirement::NonAlphanumeric => {
                f.write_str("Passwords must have at least one non alphanumeric character.")
            }
        }
    }
}

/// Rules a password must satisfy before an account is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Check a password, collecting every rule it breaks.
    pub fn validate(&self, password: &str) -> Result<(), Vec<PasswordRequirement>> {
        let mut failures = Vec::new();

        if password.chars().count() < self.required_length {
            failures.push(PasswordRequirement::TooShort(self.required_length));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            failures.push(PasswordRequirement::Digit);
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            failures.push(PasswordRequirement::Lowercase);
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            failures.push(PasswordRequirement::Uppercase);
        }
        if self.require_non_alphanumeric && password.chars().all(char::is_alphanumeric) {
            failures.push(PasswordRequirement::NonAlphanumeric);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

/// When repeated failed sign-ins lock an account, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_access_attempts: i32,
    pub default_lockout: Duration,
    pub allowed_for_new_users: bool,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_access_attempts: 5,
            default_lockout: Duration::minutes(5),
            allowed_for_new_users: true,
        }
    }
}
