//! Startup bootstrap: schema, roles, the default employee and sample data.
//!
//! `bootstrap` is the only entry point that swallows errors. Everything below
//! it returns `Result` and stops at the first failure; rows written before a
//! failure stay written.

use chrono::{Duration, Local, NaiveDateTime};
use migration::{Migrator, MigratorTrait};
use model::entities::{product, user::RoleLabel};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SeedingSettings;
use crate::identity::{IdentityError, NewUser, RoleManager, UserManager};
use crate::marketplace::{register_farmer, FarmerRegistration, NewProduct};
use crate::schemas::AppState;

pub const DEFAULT_EMPLOYEE_EMAIL: &str = "employee@agrienergy.com";
pub const DEFAULT_EMPLOYEE_PASSWORD: &str = "Employee123!";
pub const SAMPLE_FARMER_PASSWORD: &str = "Farmer123!";
pub const SAMPLE_FARMER_PHONE: &str = "+1-555-0100";
pub const SAMPLE_FARMER_ADDRESS: &str = "123 Farm Road, Agricultural District";

pub struct SampleFarmer {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub farm_name: &'static str,
    pub email: &'static str,
}

pub const SAMPLE_FARMERS: [SampleFarmer; 3] = [
    SampleFarmer {
        first_name: "Mike",
        last_name: "Johnson",
        farm_name: "Green Valley Farm",
        email: "mike@greenvalley.com",
    },
    SampleFarmer {
        first_name: "Sarah",
        last_name: "Williams",
        farm_name: "Sunrise Organics",
        email: "sarah@sunrise.com",
    },
    SampleFarmer {
        first_name: "David",
        last_name: "Brown",
        farm_name: "Riverbend Acres",
        email: "david@riverbend.com",
    },
];

impl SampleFarmer {
    fn registration(&self) -> FarmerRegistration {
        FarmerRegistration {
            first_name: self.first_name.to_string(),
            last_name: self.last_name.to_string(),
            farm_name: self.farm_name.to_string(),
            email: self.email.to_string(),
            phone_number: SAMPLE_FARMER_PHONE.to_string(),
            address: SAMPLE_FARMER_ADDRESS.to_string(),
        }
    }
}

pub struct SampleProduct {
    pub name: &'static str,
    pub category: &'static str,
    pub days_ago: i64,
    /// Price in cents.
    pub price_cents: i64,
    pub quantity: i32,
    pub description: &'static str,
}

/// Every sample farmer gets these three products.
pub const SAMPLE_PRODUCTS: [SampleProduct; 3] = [
    SampleProduct {
        name: "Organic Tomatoes",
        category: "Vegetables",
        days_ago: 10,
        price_cents: 250,
        quantity: 100,
        description: "Fresh organic tomatoes",
    },
    SampleProduct {
        name: "Sweet Corn",
        category: "Grains",
        days_ago: 5,
        price_cents: 180,
        quantity: 200,
        description: "Sweet yellow corn",
    },
    SampleProduct {
        name: "Carrots",
        category: "Vegetables",
        days_ago: 7,
        price_cents: 120,
        quantity: 150,
        description: "Fresh carrots",
    },
];

impl SampleProduct {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }

    fn new_product(&self, now: NaiveDateTime) -> NewProduct {
        NewProduct {
            name: self.name.to_string(),
            category: self.category.to_string(),
            production_date: now - Duration::days(self.days_ago),
            price: self.price(),
            quantity: self.quantity,
            description: self.description.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Schema migration failed: {0}")]
    Migration(#[source] DbErr),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

/// Collaborators the bootstrap works with.
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub db: DatabaseConnection,
    pub users: UserManager,
    pub roles: RoleManager,
    pub seeding: SeedingSettings,
}

impl StartupContext {
    pub fn from_state(state: &AppState, seeding: &SeedingSettings) -> Self {
        Self {
            db: state.db.clone(),
            users: state.user_manager(),
            roles: state.role_manager(),
            seeding: seeding.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleDataReport {
    pub farmers_created: usize,
    pub products_created: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub roles_created: Vec<String>,
    pub employee_created: bool,
    pub farmers_created: usize,
    pub products_created: usize,
}

/// Run the startup bootstrap, logging and absorbing any failure.
///
/// Returns `None` when a step failed. Start-up carries on either way.
#[instrument(skip_all)]
pub async fn bootstrap(ctx: &StartupContext) -> Option<BootstrapReport> {
    match try_bootstrap(ctx).await {
        Ok(report) => {
            info!(?report, "Database bootstrap completed");
            Some(report)
        }
        Err(e) => {
            error!(error = ?e, "An error occurred while seeding the database.");
            None
        }
    }
}

pub async fn try_bootstrap(ctx: &StartupContext) -> Result<BootstrapReport, SeedError> {
    ensure_schema(&ctx.db).await?;
    let roles_created = ensure_roles(&ctx.roles).await?;
    let employee_created = ensure_default_employee(&ctx.users).await?;

    let sample = if ctx.seeding.sample_data {
        seed_sample_data(ctx).await?
    } else {
        debug!("Sample data seeding disabled");
        SampleDataReport::default()
    };

    Ok(BootstrapReport {
        roles_created,
        employee_created,
        farmers_created: sample.farmers_created,
        products_created: sample.products_created,
    })
}

/// Apply pending migrations. Already applied migrations are left alone.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), SeedError> {
    Migrator::up(db, None).await.map_err(SeedError::Migration)?;
    debug!("Schema is up to date");
    Ok(())
}

/// Create any of the Employee and Farmer roles that are missing.
///
/// Returns the names created in this run.
#[instrument(skip_all)]
pub async fn ensure_roles(roles: &RoleManager) -> Result<Vec<String>, SeedError> {
    let mut created = Vec::new();
    for role in RoleLabel::ALL {
        if roles.role_exists(role.as_str()).await? {
            debug!(role = %role, "Role already exists");
            continue;
        }
        roles.create(role.as_str()).await?;
        created.push(role.as_str().to_string());
    }
    Ok(created)
}

/// Create the default employee account if it is missing.
///
/// An existing account that lost its Employee membership gets it back.
#[instrument(skip_all)]
pub async fn ensure_default_employee(users: &UserManager) -> Result<bool, SeedError> {
    if let Some(existing) = users.find_by_email(DEFAULT_EMPLOYEE_EMAIL).await? {
        if !users.is_in_role(&existing, RoleLabel::Employee.as_str()).await? {
            warn!("Default employee is missing the Employee role, restoring it");
            users.add_to_role(&existing, RoleLabel::Employee.as_str()).await?;
        }
        debug!("Default employee account already exists");
        return Ok(false);
    }

    let employee = NewUser {
        email: DEFAULT_EMPLOYEE_EMAIL.to_string(),
        first_name: "John".to_string(),
        last_name: "Smith".to_string(),
        role: RoleLabel::Employee,
    };
    match users.create(employee, DEFAULT_EMPLOYEE_PASSWORD).await {
        Ok(employee) => {
            users.add_to_role(&employee, RoleLabel::Employee.as_str()).await?;
            info!("Default employee account created successfully.");
            Ok(true)
        }
        Err(e) if e.is_rejection() => {
            warn!(error = %e, "Default employee account was not created");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Create the sample farmers that do not exist yet, each with its products.
#[instrument(skip_all)]
pub async fn seed_sample_data(ctx: &StartupContext) -> Result<SampleDataReport, SeedError> {
    let now = Local::now().naive_local();
    let mut report = SampleDataReport::default();

    for sample in &SAMPLE_FARMERS {
        if ctx.users.find_by_email(sample.email).await?.is_some() {
            debug!(email = sample.email, "Sample farmer already exists");
            continue;
        }

        let profile =
            match register_farmer(&ctx.db, &ctx.users, sample.registration(), SAMPLE_FARMER_PASSWORD).await {
                Ok(profile) => profile,
                Err(e) if e.is_rejection() => {
                    warn!(email = sample.email, error = %e, "Sample farmer was not created");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

        let products = SAMPLE_PRODUCTS
            .iter()
            .map(|p| p.new_product(now).into_active_model(profile.farmer_id));
        product::Entity::insert_many(products).exec(&ctx.db).await?;

        report.farmers_created += 1;
        report.products_created += SAMPLE_PRODUCTS.len();
        info!(farm = sample.farm_name, farmer_id = profile.farmer_id, "Sample farmer seeded");
    }

    Ok(report)
}
