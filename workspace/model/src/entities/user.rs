use sea_orm::entity::prelude::*;
use std::fmt;

/// The role label stored on the user row itself.
///
/// Role membership proper lives in `user_roles`; this label is what the site
/// reads to pick a dashboard after sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RoleLabel {
    #[sea_orm(string_value = "Employee")]
    Employee,
    #[sea_orm(string_value = "Farmer")]
    Farmer,
}

impl RoleLabel {
    /// All roles, in the order they are ensured at startup.
    pub const ALL: [RoleLabel; 2] = [RoleLabel::Employee, RoleLabel::Farmer];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleLabel::Employee => "Employee",
            RoleLabel::Farmer => "Farmer",
        }
    }
}

impl fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identity principal: an employee or a farmer account.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_name: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: RoleLabel,
    pub lockout_enabled: bool,
    pub access_failed_count: i32,
    /// While in the future, password sign-in is refused.
    pub lockout_end: Option<DateTimeUtc>,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_locked_out(&self, now: DateTimeUtc) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::farmer::Entity")]
    Farmer,
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRole,
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRole.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::Role.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
