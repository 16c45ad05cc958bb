use crate::error::developer_error_page;
use crate::handlers::{account, employee, farmer, health::health_check, home, products};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    compression::CompressionLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Directory static assets are served from
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Home
        .route("/", get(home::index))
        .route("/Home", get(home::index))
        .route("/Home/Index", get(home::index))
        .route("/Home/Privacy", get(home::privacy))
        .route("/Home/Error", get(home::error))
        // Account
        .route("/Account/Login", get(account::login_page).post(account::login))
        .route("/Account/Logout", post(account::logout))
        .route("/Account/AccessDenied", get(account::access_denied))
        // Employee area
        .route("/Employee", get(employee::index))
        .route("/Employee/Index", get(employee::index))
        .route(
            "/Employee/AddFarmer",
            get(employee::add_farmer_page).post(employee::add_farmer),
        )
        .route("/Employee/Products", get(employee::products))
        .route("/Employee/Products/:farmer_id", get(employee::farmer_products))
        // Farmer area
        .route("/Farmer", get(farmer::index))
        .route("/Farmer/Index", get(farmer::index))
        .route(
            "/Farmer/AddProduct",
            get(farmer::add_product_page).post(farmer::add_product_submit),
        )
        // Health check
        .route("/health", get(health_check))
        // API v1 routes
        .route("/api/v1/products", get(products::get_products))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(not_found)
        .layer(middleware::map_response_with_state(state.clone(), developer_error_page))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state)
}
