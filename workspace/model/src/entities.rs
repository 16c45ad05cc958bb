//! SeaORM entities for the marketplace.
//!
//! `user`, `role` and `user_role` form the identity store. `farmer` and
//! `product` hold the marketplace data; a farmer profile is owned by exactly
//! one user and a product belongs to exactly one farmer.

pub mod farmer;
pub mod product;
pub mod role;
pub mod user;
pub mod user_role;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::farmer::Entity as Farmer;
    pub use super::product::Entity as Product;
    pub use super::role::Entity as Role;
    pub use super::user::Entity as User;
    pub use super::user_role::Entity as UserRole;
}
