use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, debug, trace, error, warn};

use crate::config::{initialize_app_state, Settings};
use crate::router::create_router;
use crate::seed::{bootstrap, StartupContext};

pub async fn serve(settings: &Settings) -> Result<()> {
    trace!("Entering serve function");
    info!("AgriEnergy Connect starting up");
    let bind_address = &settings.server.bind_address;
    debug!("Database URL: {}", settings.connection_strings.default_connection);
    debug!("Bind address: {}", bind_address);

    // Initialize application state
    trace!("Initializing application state");
    let state = match initialize_app_state(settings).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    // Bootstrap failures are logged inside and never stop start-up
    let context = StartupContext::from_state(&state, &settings.seeding);
    if bootstrap(&context).await.is_none() {
        warn!("Continuing start-up without a complete bootstrap");
    }

    // Create router
    trace!("Creating application router");
    let app = create_router(state);
    debug!("Router created successfully");

    // Start server
    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("AgriEnergy Connect running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
