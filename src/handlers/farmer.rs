use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, instrument};
use validator::Validate;

use super::{page_context, render, validation_messages};
use crate::error::AppError;
use crate::marketplace::{
    add_product, farmer_for_user, search_products, NewProduct, ProductFilter, PRODUCT_CATEGORIES,
};
use crate::schemas::{AppState, ProductResponse};
use crate::session::{CurrentUser, RequireFarmer};

/// Product form. Date, price and quantity arrive as text and are parsed here.
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct AddProductForm {
    #[validate(length(min = 1, max = 200, message = "Product name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category is required."))]
    pub category: String,
    pub production_date: String,
    pub price: String,
    pub quantity: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters."))]
    pub description: String,
}

impl AddProductForm {
    /// Validate the form against `today`, collecting every problem.
    pub fn parse(&self, today: NaiveDate) -> Result<NewProduct, Vec<String>> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_messages(&e),
        };

        let production_date = match NaiveDate::parse_from_str(self.production_date.trim(), "%Y-%m-%d") {
            Ok(date) if date > today => {
                errors.push("Production date cannot be in the future.".to_string());
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push("Production date must be a valid date.".to_string());
                None
            }
        };

        let price = match Decimal::from_str(self.price.trim()) {
            Ok(price) if price <= Decimal::ZERO => {
                errors.push("Price must be greater than zero.".to_string());
                None
            }
            Ok(price) if price.scale() > 2 => {
                errors.push("Price can have at most two decimal places.".to_string());
                None
            }
            Ok(price) => Some(price),
            Err(_) => {
                errors.push("Price must be a number.".to_string());
                None
            }
        };

        let quantity = match self.quantity.trim().parse::<i32>() {
            Ok(quantity) if quantity < 0 => {
                errors.push("Quantity cannot be negative.".to_string());
                None
            }
            Ok(quantity) => Some(quantity),
            Err(_) => {
                errors.push("Quantity must be a whole number.".to_string());
                None
            }
        };

        match (production_date, price, quantity) {
            (Some(date), Some(price), Some(quantity)) if errors.is_empty() => Ok(NewProduct {
                name: self.name.trim().to_string(),
                category: self.category.trim().to_string(),
                production_date: date.and_time(NaiveTime::MIN),
                price,
                quantity,
                description: self.description.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// Farmer dashboard: the signed-in farmer's own products.
#[instrument(skip_all, fields(user_id = user.session.user_id))]
pub async fn index(
    State(state): State<AppState>,
    RequireFarmer(user): RequireFarmer,
) -> Result<Html<String>, AppError> {
    let profile = farmer_for_user(&state.db, user.session.user_id).await?;

    let products: Vec<ProductResponse> = match &profile {
        Some(profile) => {
            let filter = ProductFilter {
                farmer_id: Some(profile.farmer_id),
                ..Default::default()
            };
            search_products(&state.db, &filter)
                .await?
                .into_iter()
                .map(ProductResponse::from)
                .collect()
        }
        None => {
            debug!("Farmer account has no profile");
            Vec::new()
        }
    };

    let mut context = page_context(Some(&user));
    context.insert("farm_name", &profile.map(|p| p.farm_name));
    context.insert("products", &products);
    render(&state, "farmer/index.html", &context)
}

fn add_product_page_response(
    state: &AppState,
    user: &CurrentUser,
    form: &AddProductForm,
    errors: Vec<String>,
) -> Result<Html<String>, AppError> {
    let mut context = page_context(Some(user));
    context.insert("form", form);
    context.insert("errors", &errors);
    context.insert("categories", &PRODUCT_CATEGORIES);
    context.insert("today", &Local::now().date_naive().to_string());
    render(state, "farmer/add_product.html", &context)
}

pub async fn add_product_page(
    State(state): State<AppState>,
    RequireFarmer(user): RequireFarmer,
) -> Result<Html<String>, AppError> {
    let form = AddProductForm {
        production_date: Local::now().date_naive().to_string(),
        quantity: "1".to_string(),
        ..Default::default()
    };
    add_product_page_response(&state, &user, &form, Vec::new())
}

#[instrument(skip_all, fields(user_id = user.session.user_id))]
pub async fn add_product_submit(
    State(state): State<AppState>,
    RequireFarmer(user): RequireFarmer,
    Form(form): Form<AddProductForm>,
) -> Result<Response, AppError> {
    let profile = farmer_for_user(&state.db, user.session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Farmer profile".to_string()))?;

    match form.parse(Local::now().date_naive()) {
        Ok(new_product) => {
            add_product(&state.db, profile.farmer_id, new_product).await?;
            Ok(Redirect::to("/Farmer/Index").into_response())
        }
        Err(errors) => {
            debug!(?errors, "Product form rejected");
            let page = add_product_page_response(&state, &user, &form, errors)?;
            Ok(page.into_response())
        }
    }
}
