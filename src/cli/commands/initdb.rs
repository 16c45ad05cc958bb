use anyhow::Result;
use sea_orm::Database;
use tracing::{debug, error, info, instrument};

use crate::config::Settings;
use crate::seed::ensure_schema;

/// Create or upgrade the schema and stop. Roles and accounts are left to
/// `seed` or the start-up bootstrap of `serve`.
#[instrument(skip_all)]
pub async fn init_database(settings: &Settings) -> Result<()> {
    let database_url = &settings.connection_strings.default_connection;
    debug!(%database_url, "Opening database for schema setup");

    let db = Database::connect(database_url).await.map_err(|e| {
        error!(%database_url, error = %e, "Cannot open database");
        e
    })?;

    if let Err(e) = ensure_schema(&db).await {
        error!(error = %e, "Schema setup failed");
        return Err(e.into());
    }

    info!("Schema ready; run `seed` or `serve` to create the default accounts");
    Ok(())
}
