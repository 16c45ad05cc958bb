use chrono::{DateTime, Utc};
use model::entities::{role, user, user_role};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, Set,
};
use tracing::{debug, info, instrument, warn};

use super::{hash_password, verify_password, IdentityError, LockoutPolicy, PasswordPolicy};

/// Emails are stored and compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile fields for a new account. The password is passed separately.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: user::RoleLabel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Succeeded(user::Model),
    LockedOut,
    Failed,
}

/// Account creation, role membership and password sign-in.
#[derive(Debug, Clone)]
pub struct UserManager {
    db: DatabaseConnection,
    password_policy: PasswordPolicy,
    lockout: LockoutPolicy,
}

impl UserManager {
    pub fn new(db: DatabaseConnection, password_policy: PasswordPolicy, lockout: LockoutPolicy) -> Self {
        Self {
            db,
            password_policy,
            lockout,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
    }

    /// Create an account after checking the email is free and the password
    /// satisfies the policy.
    #[instrument(skip(self, new_user, password), fields(email = %new_user.email))]
    pub async fn create(&self, new_user: NewUser, password: &str) -> Result<user::Model, IdentityError> {
        let email = normalize_email(&new_user.email);

        if self.find_by_email(&email).await?.is_some() {
            debug!("Email already registered");
            return Err(IdentityError::DuplicateEmail(email));
        }
        self.password_policy
            .validate(password)
            .map_err(IdentityError::WeakPassword)?;

        let password_hash = hash_password(password)?;
        let created = user::ActiveModel {
            user_name: Set(email.clone()),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            role: Set(new_user.role),
            lockout_enabled: Set(self.lockout.allowed_for_new_users),
            access_failed_count: Set(0),
            lockout_end: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(user_id = created.id, role = %created.role, "User account created");
        Ok(created)
    }

    /// Add a membership row. Adding an existing membership is a no-op.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn add_to_role(&self, user: &user::Model, role_name: &str) -> Result<(), IdentityError> {
        let role = role::Entity::find()
            .filter(role::Column::Name.eq(role_name))
            .one(&self.db)
            .await?
            .ok_or_else(|| IdentityError::RoleNotFound(role_name.to_string()))?;

        if user_role::Entity::find_by_id((user.id, role.id))
            .one(&self.db)
            .await?
            .is_some()
        {
            debug!("User already in role");
            return Ok(());
        }

        user_role::ActiveModel {
            user_id: Set(user.id),
            role_id: Set(role.id),
        }
        .insert(&self.db)
        .await?;

        debug!("User added to role");
        Ok(())
    }

    pub async fn is_in_role(&self, user: &user::Model, role_name: &str) -> Result<bool, DbErr> {
        let count = user
            .find_related(role::Entity)
            .filter(role::Column::Name.eq(role_name))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn role_names(&self, user: &user::Model) -> Result<Vec<String>, DbErr> {
        let roles = user.find_related(role::Entity).all(&self.db).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    /// Check credentials, applying the lockout policy.
    ///
    /// An unknown email and a wrong password both come back as `Failed`.
    #[instrument(skip(self, password))]
    pub async fn password_sign_in(&self, email: &str, password: &str) -> Result<SignInResult, IdentityError> {
        let Some(user) = self.find_by_email(email).await? else {
            debug!("No account for email");
            return Ok(SignInResult::Failed);
        };

        let now = Utc::now();
        if user.is_locked_out(now) {
            warn!(user_id = user.id, "Sign-in refused, account is locked out");
            return Ok(SignInResult::LockedOut);
        }

        if verify_password(password, &user.password_hash)? {
            let user = self.reset_access_failed(user).await?;
            info!(user_id = user.id, "User signed in");
            return Ok(SignInResult::Succeeded(user));
        }

        self.record_access_failed(user, now).await
    }

    async fn reset_access_failed(&self, user: user::Model) -> Result<user::Model, DbErr> {
        if user.access_failed_count == 0 && user.lockout_end.is_none() {
            return Ok(user);
        }
        let mut active = user.into_active_model();
        active.access_failed_count = Set(0);
        active.lockout_end = Set(None);
        active.update(&self.db).await
    }

    async fn record_access_failed(
        &self,
        user: user::Model,
        now: DateTime<Utc>,
    ) -> Result<SignInResult, IdentityError> {
        if !user.lockout_enabled {
            debug!(user_id = user.id, "Wrong password");
            return Ok(SignInResult::Failed);
        }

        // Counted in SQL so concurrent failures are never lost
        let user_id = user.id;
        user::Entity::update_many()
            .col_expr(
                user::Column::AccessFailedCount,
                Expr::col(user::Column::AccessFailedCount).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        let locked = user::Entity::update_many()
            .col_expr(user::Column::AccessFailedCount, Expr::value(0))
            .col_expr(
                user::Column::LockoutEnd,
                Expr::value(now + self.lockout.default_lockout),
            )
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::AccessFailedCount.gte(self.lockout.max_failed_access_attempts))
            .exec(&self.db)
            .await?;
        if locked.rows_affected > 0 {
            warn!(user_id, "Too many failed sign-in attempts, account locked out");
            return Ok(SignInResult::LockedOut);
        }

        debug!(user_id, "Wrong password");
        Ok(SignInResult::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct RoleManager {
    db: DatabaseConnection,
}

impl RoleManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<role::Model>, DbErr> {
        role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
    }

    pub async fn role_exists(&self, name: &str) -> Result<bool, DbErr> {
        Ok(self.find_by_name(name).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<role::Model, IdentityError> {
        if self.role_exists(name).await? {
            return Err(IdentityError::DuplicateRole(name.to_string()));
        }

        let created = role::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(role_id = created.id, "Role created");
        Ok(created)
    }
}
