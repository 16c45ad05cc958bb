use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};
use validator::Validate;

use super::{page_context, render, validation_messages};
use crate::error::AppError;
use crate::marketplace::{
    farmer_summaries, find_farmer, product_categories, register_farmer, search_products,
    FarmerRegistration, ProductFilter,
};
use crate::schemas::{AppState, ProductResponse};
use crate::session::{CurrentUser, RequireEmployee};

/// Farmer registration form
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct AddFarmerForm {
    #[validate(length(min = 1, max = 100, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required."))]
    pub last_name: String,
    #[validate(length(min = 1, max = 200, message = "Farm name is required."))]
    pub farm_name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "Phone number is required."))]
    pub phone_number: String,
    #[validate(length(min = 1, max = 300, message = "Address is required."))]
    pub address: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "The password and confirmation password do not match."))]
    pub confirm_password: String,
}

impl AddFarmerForm {
    fn registration(&self) -> FarmerRegistration {
        FarmerRegistration {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            farm_name: self.farm_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

/// Query string of the product listing. Empty values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilterQuery {
    pub category: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ProductFilterQuery {
    pub fn into_filter(self, farmer_id: Option<i32>) -> Result<ProductFilter, AppError> {
        let from = parse_date(self.from, "start")?;
        let to = parse_date(self.to, "end")?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::Validation(
                    "The start date must not be after the end date.".to_string(),
                ));
            }
        }

        Ok(ProductFilter {
            farmer_id,
            category: non_empty(self.category),
            from,
            to,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(value: Option<String>, which: &str) -> Result<Option<NaiveDate>, AppError> {
    match non_empty(value) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("The {} date must be in YYYY-MM-DD format.", which))),
    }
}

/// Employee dashboard: every farmer with its product count.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireEmployee(user): RequireEmployee,
) -> Result<Html<String>, AppError> {
    let farmers = farmer_summaries(&state.db).await?;
    debug!(count = farmers.len(), "Listing farmers");

    let mut context = page_context(Some(&user));
    context.insert("farmers", &farmers);
    render(&state, "employee/index.html", &context)
}

fn add_farmer_page_response(
    state: &AppState,
    user: &CurrentUser,
    form: &AddFarmerForm,
    errors: Vec<String>,
) -> Result<Html<String>, AppError> {
    let mut context = page_context(Some(user));
    context.insert("form", form);
    context.insert("errors", &errors);
    context.insert("password_length", &state.password_policy.required_length);
    render(state, "employee/add_farmer.html", &context)
}

pub async fn add_farmer_page(
    State(state): State<AppState>,
    RequireEmployee(user): RequireEmployee,
) -> Result<Html<String>, AppError> {
    add_farmer_page_response(&state, &user, &AddFarmerForm::default(), Vec::new())
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn add_farmer(
    State(state): State<AppState>,
    RequireEmployee(user): RequireEmployee,
    Form(form): Form<AddFarmerForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        debug!("Farmer form rejected");
        let page = add_farmer_page_response(&state, &user, &form, validation_messages(&errors))?;
        return Ok(page.into_response());
    }

    let users = state.user_manager();
    match register_farmer(&state.db, &users, form.registration(), &form.password).await {
        Ok(profile) => {
            info!(farmer_id = profile.farmer_id, added_by = user.session.user_id, "Farmer added");
            Ok(Redirect::to("/Employee/Index").into_response())
        }
        Err(e) if e.is_rejection() => {
            debug!(error = %e, "Farmer registration rejected");
            let page = add_farmer_page_response(&state, &user, &form, vec![e.to_string()])?;
            Ok(page.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Product listing across all farmers, filtered by category and date range.
#[instrument(skip(state, user, query))]
pub async fn products(
    State(state): State<AppState>,
    RequireEmployee(user): RequireEmployee,
    Query(query): Query<ProductFilterQuery>,
) -> Result<Html<String>, AppError> {
    products_page(&state, &user, None, query).await
}

/// Product listing for one farmer. An id that is not a number names no farmer.
#[instrument(skip(state, user, query))]
pub async fn farmer_products(
    State(state): State<AppState>,
    RequireEmployee(user): RequireEmployee,
    Path(farmer_id): Path<String>,
    Query(query): Query<ProductFilterQuery>,
) -> Result<Html<String>, AppError> {
    let id = farmer_id
        .parse::<i32>()
        .map_err(|_| AppError::NotFound(format!("Farmer {}", farmer_id)))?;
    products_page(&state, &user, Some(id), query).await
}

async fn products_page(
    state: &AppState,
    user: &CurrentUser,
    farmer_id: Option<i32>,
    query: ProductFilterQuery,
) -> Result<Html<String>, AppError> {
    let farm_name = match farmer_id {
        Some(id) => {
            let farmer = find_farmer(&state.db, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Farmer {}", id)))?;
            Some(farmer.farm_name)
        }
        None => None,
    };

    let filter = query.into_filter(farmer_id)?;
    let products: Vec<ProductResponse> = search_products(&state.db, &filter)
        .await?
        .into_iter()
        .map(ProductResponse::from)
        .collect();
    let categories = product_categories(&state.db).await?;

    let mut context = page_context(Some(user));
    context.insert("farmer_id", &farmer_id);
    context.insert("farm_name", &farm_name);
    context.insert("products", &products);
    context.insert("categories", &categories);
    context.insert(
        "filter",
        &json!({
            "category": filter.category,
            "from": filter.from.map(|d| d.to_string()),
            "to": filter.to.map(|d| d.to_string()),
        }),
    );
    render(state, "employee/products.html", &context)
}
