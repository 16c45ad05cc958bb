use anyhow::Result;
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tera::Tera;
use tracing::{debug, info};

use crate::identity::{LockoutPolicy, PasswordPolicy};
use crate::schemas::AppState;
use crate::session::SessionStore;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://agrienergy.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_COOKIE: &str = ".AgriEnergy.Session";

/// Glob the page templates are loaded from.
pub const TEMPLATE_GLOB: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum RuntimeEnvironment {
    Development,
    #[default]
    Production,
}

impl RuntimeEnvironment {
    pub fn is_development(&self) -> bool {
        matches!(self, RuntimeEnvironment::Development)
    }
}

/// Application settings.
///
/// Layered from serde defaults, an optional `appsettings.toml` and `AGRI__*`
/// environment variables, e.g. `AGRI__CONNECTION_STRINGS__DEFAULT_CONNECTION`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: RuntimeEnvironment,
    pub connection_strings: ConnectionStrings,
    pub server: ServerSettings,
    pub identity: IdentitySettings,
    pub session: SessionSettings,
    pub seeding: SeedingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionStrings {
    pub default_connection: String,
}

impl Default for ConnectionStrings {
    fn default() -> Self {
        Self {
            default_connection: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub password: PasswordPolicy,
    pub lockout: LockoutSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockoutSettings {
    pub max_failed_access_attempts: i32,
    pub default_lockout_minutes: i64,
    pub allowed_for_new_users: bool,
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_failed_access_attempts: 5,
            default_lockout_minutes: 5,
            allowed_for_new_users: true,
        }
    }
}

impl From<&LockoutSettings> for LockoutPolicy {
    fn from(settings: &LockoutSettings) -> Self {
        LockoutPolicy {
            max_failed_access_attempts: settings.max_failed_access_attempts,
            default_lockout: chrono::Duration::minutes(settings.default_lockout_minutes),
            allowed_for_new_users: settings.allowed_for_new_users,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub idle_timeout_minutes: u64,
    pub cookie_name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: 30,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_minutes * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedingSettings {
    /// Seed the three sample farmers and their products.
    pub sample_data: bool,
}

impl Default for SeedingSettings {
    fn default() -> Self {
        Self { sample_data: true }
    }
}

impl Settings {
    /// Load settings from `.env`, `appsettings.toml` and the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(
                Environment::with_prefix("AGRI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config.try_deserialize()?;
        debug!(environment = ?settings.environment, "Settings loaded");
        Ok(settings)
    }

    /// Apply command line overrides on top of the loaded settings.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.connection_strings.default_connection = url;
        }
        if let Some(address) = bind_address {
            self.server.bind_address = address;
        }
        self
    }
}

/// Load the page templates.
pub fn load_templates() -> Result<Tera> {
    let tera = Tera::new(TEMPLATE_GLOB)?;
    debug!(count = tera.get_template_names().count(), "Templates loaded");
    Ok(tera)
}

/// Connect to the database and build the shared application state.
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    let database_url = &settings.connection_strings.default_connection;
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let templates = load_templates()?;

    Ok(AppState {
        db,
        templates: Arc::new(templates),
        sessions: SessionStore::new(&settings.session),
        password_policy: settings.identity.password.clone(),
        lockout: LockoutPolicy::from(&settings.identity.lockout),
        environment: settings.environment,
    })
}
