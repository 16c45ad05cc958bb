//! Farmer and product operations shared by the seeder and the site.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use model::entities::{
    farmer, product,
    user::{self, RoleLabel},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info, instrument};

use crate::identity::{IdentityError, NewUser, UserManager};
use crate::schemas::FarmerSummary;

/// Suggested categories on the product form. Any non-empty category is accepted.
pub const PRODUCT_CATEGORIES: [&str; 6] =
    ["Vegetables", "Fruits", "Grains", "Dairy", "Livestock", "Other"];

#[derive(Debug, Clone)]
pub struct FarmerRegistration {
    pub first_name: String,
    pub last_name: String,
    pub farm_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
}

impl FarmerRegistration {
    fn new_user(&self) -> NewUser {
        NewUser {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: RoleLabel::Farmer,
        }
    }
}

/// Create a farmer account, add it to the Farmer role and insert its profile.
///
/// The profile insert returns the generated `farmer_id`. Nothing is rolled
/// back if a later step fails.
#[instrument(skip(db, users, registration, password), fields(email = %registration.email))]
pub async fn register_farmer(
    db: &DatabaseConnection,
    users: &UserManager,
    registration: FarmerRegistration,
    password: &str,
) -> Result<farmer::Model, IdentityError> {
    let user = users.create(registration.new_user(), password).await?;
    users.add_to_role(&user, RoleLabel::Farmer.as_str()).await?;

    let profile = farmer::ActiveModel {
        user_id: Set(user.id),
        farm_name: Set(registration.farm_name),
        email: Set(user.email.clone()),
        phone_number: Set(registration.phone_number),
        address: Set(registration.address),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(farmer_id = profile.farmer_id, user_id = user.id, "Farmer registered");
    Ok(profile)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub production_date: NaiveDateTime,
    pub price: Decimal,
    pub quantity: i32,
    pub description: String,
}

impl NewProduct {
    pub fn into_active_model(self, farmer_id: i32) -> product::ActiveModel {
        product::ActiveModel {
            farmer_id: Set(farmer_id),
            name: Set(self.name),
            category: Set(self.category),
            production_date: Set(self.production_date),
            price: Set(self.price),
            quantity: Set(self.quantity),
            description: Set(self.description),
            ..Default::default()
        }
    }
}

pub async fn add_product(
    db: &DatabaseConnection,
    farmer_id: i32,
    new_product: NewProduct,
) -> Result<product::Model, DbErr> {
    let created = new_product.into_active_model(farmer_id).insert(db).await?;
    info!(product_id = created.product_id, farmer_id, "Product added");
    Ok(created)
}

/// Product search criteria. Every field is optional; dates are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub farmer_id: Option<i32>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn search_products(
    db: &DatabaseConnection,
    filter: &ProductFilter,
) -> Result<Vec<product::Model>, DbErr> {
    let mut query = product::Entity::find();

    if let Some(farmer_id) = filter.farmer_id {
        query = query.filter(product::Column::FarmerId.eq(farmer_id));
    }
    if let Some(category) = &filter.category {
        query = query.filter(product::Column::Category.eq(category.as_str()));
    }
    if let Some(from) = filter.from {
        query = query.filter(product::Column::ProductionDate.gte(from.and_time(NaiveTime::MIN)));
    }
    if let Some(next_day) = filter.to.and_then(|to| to.succ_opt()) {
        query = query.filter(product::Column::ProductionDate.lt(next_day.and_time(NaiveTime::MIN)));
    }

    let products = query
        .order_by_desc(product::Column::ProductionDate)
        .order_by_asc(product::Column::Name)
        .all(db)
        .await?;
    debug!(count = products.len(), ?filter, "Products found");
    Ok(products)
}

/// Distinct categories in use, for the filter form.
pub async fn product_categories(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    product::Entity::find()
        .select_only()
        .column(product::Column::Category)
        .distinct()
        .order_by_asc(product::Column::Category)
        .into_tuple::<String>()
        .all(db)
        .await
}

pub async fn find_farmer(db: &DatabaseConnection, farmer_id: i32) -> Result<Option<farmer::Model>, DbErr> {
    farmer::Entity::find_by_id(farmer_id).one(db).await
}

pub async fn farmer_for_user(db: &DatabaseConnection, user_id: i32) -> Result<Option<farmer::Model>, DbErr> {
    farmer::Entity::find()
        .filter(farmer::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// Every farmer with its owner's name and product count, by farm name.
pub async fn farmer_summaries(db: &DatabaseConnection) -> Result<Vec<FarmerSummary>, DbErr> {
    let farmers = farmer::Entity::find()
        .find_also_related(user::Entity)
        .order_by_asc(farmer::Column::FarmName)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(farmers.len());
    for (farmer, owner) in farmers {
        let product_count = farmer.find_related(product::Entity).count(db).await?;
        let owner_name = owner.map(|u| u.full_name()).unwrap_or_default();
        summaries.push(FarmerSummary::new(farmer, owner_name, product_count));
    }
    Ok(summaries)
}
