use anyhow::Result;
use tracing::{info, trace, error};

use crate::config::{initialize_app_state, Settings};
use crate::seed::{try_bootstrap, StartupContext};

/// Run the bootstrap once and report what it created.
///
/// Unlike `serve`, a failed bootstrap is an error here.
pub async fn seed(settings: &Settings) -> Result<()> {
    trace!("Entering seed function");
    let state = initialize_app_state(settings).await?;
    let context = StartupContext::from_state(&state, &settings.seeding);

    match try_bootstrap(&context).await {
        Ok(report) => {
            info!(
                "Seeding finished: roles created {:?}, default employee created: {}, {} farmers and {} products added",
                report.roles_created,
                report.employee_created,
                report.farmers_created,
                report.products_created
            );
            Ok(())
        }
        Err(e) => {
            error!("An error occurred while seeding the database: {:?}", e);
            Err(e.into())
        }
    }
}
