use chrono::{NaiveDate, NaiveDateTime};
use model::entities::{farmer, product};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::Tera;
use utoipa::{IntoParams, OpenApi, ToSchema};
use validator::Validate;

use crate::config::RuntimeEnvironment;
use crate::identity::{LockoutPolicy, PasswordPolicy, RoleManager, UserManager};
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Page templates
    pub templates: Arc<Tera>,
    /// Server-side cookie sessions
    pub sessions: SessionStore,
    pub password_policy: PasswordPolicy,
    pub lockout: LockoutPolicy,
    pub environment: RuntimeEnvironment,
}

impl AppState {
    pub fn user_manager(&self) -> UserManager {
        UserManager::new(self.db.clone(), self.password_policy.clone(), self.lockout.clone())
    }

    pub fn role_manager(&self) -> RoleManager {
        RoleManager::new(self.db.clone())
    }
}

/// Query parameters for the product search endpoint
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Only products of this farmer
    #[validate(range(min = 1))]
    pub farmer_id: Option<i32>,
    /// Exact category match, e.g. "Vegetables"
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    /// Earliest production date, inclusive (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Latest production date, inclusive (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// A product as listed on the site and returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub product_id: i32,
    pub farmer_id: i32,
    pub name: String,
    pub category: String,
    pub production_date: NaiveDateTime,
    /// Unit price with two decimal places
    #[schema(value_type = String)]
    pub price: Decimal,
    pub quantity: i32,
    pub description: String,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        let mut price = model.price;
        price.rescale(2);
        Self {
            product_id: model.product_id,
            farmer_id: model.farmer_id,
            name: model.name,
            category: model.category,
            production_date: model.production_date,
            price,
            quantity: model.quantity,
            description: model.description,
        }
    }
}

/// A farmer profile with the number of products it lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FarmerSummary {
    pub farmer_id: i32,
    pub farm_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub product_count: u64,
}

impl FarmerSummary {
    pub fn new(farmer: farmer::Model, owner_name: String, product_count: u64) -> Self {
        Self {
            farmer_id: farmer.farmer_id,
            farm_name: farmer.farm_name,
            owner_name,
            email: farmer.email,
            phone_number: farmer.phone_number,
            address: farmer.address,
            product_count,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::products::get_products,
    ),
    components(
        schemas(
            ApiResponse<Vec<ProductResponse>>,
            ErrorResponse,
            HealthResponse,
            ProductResponse,
            FarmerSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "products", description = "Product search for employees"),
    ),
    info(
        title = "AgriEnergy Connect API",
        description = "Farmer and product data behind the AgriEnergy Connect marketplace",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
