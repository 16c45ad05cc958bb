//! Accounts, roles and credentials.
//!
//! `UserManager` and `RoleManager` own every write to the `users`, `roles`
//! and `user_roles` tables. Password hashing uses Argon2 PHC strings.

pub mod manager;
pub mod password;
pub mod policy;

pub use manager::{NewUser, RoleManager, SignInResult, UserManager};
pub use password::{hash_password, verify_password};
pub use policy::{LockoutPolicy, PasswordPolicy, PasswordRequirement};

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Email '{0}' is already taken.")]
    DuplicateEmail(String),
    #[error("Role name '{0}' is already taken.")]
    DuplicateRole(String),
    #[error("{}", describe_requirements(.0))]
    WeakPassword(Vec<PasswordRequirement>),
    #[error("Role '{0}' does not exist.")]
    RoleNotFound(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl IdentityError {
    /// True when the identity rules refused the request, as opposed to the
    /// store or the hasher failing underneath it.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            IdentityError::DuplicateEmail(_)
                | IdentityError::DuplicateRole(_)
                | IdentityError::WeakPassword(_)
        )
    }
}

fn describe_requirements(requirements: &[PasswordRequirement]) -> String {
    requirements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_password_message_lists_every_rule() {
        let error = IdentityError::WeakPassword(vec![
            PasswordRequirement::TooShort(6),
            PasswordRequirement::Digit,
        ]);
        assert_eq!(
            error.to_string(),
            "Passwords must be at least 6 characters. Passwords must have at least one digit ('0'-'9')."
        );
    }

    #[test]
    fn test_rejections_versus_failures() {
        assert!(IdentityError::DuplicateEmail("a@b.c".into()).is_rejection());
        assert!(IdentityError::WeakPassword(vec![]).is_rejection());
        assert!(!IdentityError::RoleNotFound("Farmer".into()).is_rejection());
        assert!(!IdentityError::Database(DbErr::Custom("boom".into())).is_rejection());
    }
}
