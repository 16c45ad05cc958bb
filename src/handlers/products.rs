use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use tracing::{debug, error, info, instrument, trace};

use crate::marketplace::{search_products, ProductFilter};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, ProductQuery, ProductResponse};
use crate::session::RequireEmployee;

/// Search products across all farmers
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Vec<ProductResponse>>),
        (status = 303, description = "Not signed in as an employee; redirected to the login page"),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, _employee))]
pub async fn get_products(
    State(state): State<AppState>,
    _employee: RequireEmployee,
    Valid(Query(query)): Valid<Query<ProductQuery>>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductResponse>>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering get_products function");

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            debug!("Rejecting inverted date range {} > {}", from, to);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "'from' must not be after 'to'".to_string(),
                    code: "VALIDATION_ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    }

    let filter = ProductFilter {
        farmer_id: query.farmer_id,
        category: query.category,
        from: query.from,
        to: query.to,
    };

    match search_products(&state.db, &filter).await {
        Ok(products) => {
            info!("Successfully retrieved {} products", products.len());
            let response = ApiResponse {
                data: products.into_iter().map(ProductResponse::from).collect(),
                message: "Products retrieved successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::OK, Json(response)))
        }
        Err(e) => {
            error!("Failed to retrieve products: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to retrieve products".to_string(),
                    code: "DATABASE_ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}
