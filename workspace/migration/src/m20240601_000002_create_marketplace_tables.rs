use crate::entity_iden::EntityIden;
use model::entities::prelude::*;
use model::entities::{farmer, product, user};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create farmers table, one profile per user
        manager
            .create_table(
                Table::create()
                    .table(Farmer::table())
                    .if_not_exists()
                    .col(pk_auto(Farmer::column(farmer::Column::FarmerId)))
                    .col(integer(Farmer::column(farmer::Column::UserId)).unique_key())
                    .col(string_len(Farmer::column(farmer::Column::FarmName), 200))
                    .col(string_len(Farmer::column(farmer::Column::Email), 256))
                    .col(string_len(Farmer::column(farmer::Column::PhoneNumber), 50))
                    .col(string(Farmer::column(farmer::Column::Address)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_farmers_user")
                            .from(Farmer::table(), Farmer::column(farmer::Column::UserId))
                            .to(User::table(), User::column(user::Column::Id))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Product::table())
                    .if_not_exists()
                    .col(pk_auto(Product::column(product::Column::ProductId)))
                    .col(integer(Product::column(product::Column::FarmerId)))
                    .col(string_len(Product::column(product::Column::Name), 200))
                    .col(string_len(Product::column(product::Column::Category), 100))
                    .col(date_time(Product::column(product::Column::ProductionDate)))
                    .col(
                        decimal(Product::column(product::Column::Price))
                            .decimal_len(16, 2),
                    )
                    .col(integer(Product::column(product::Column::Quantity)))
                    .col(text(Product::column(product::Column::Description)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_farmer")
                            .from(Product::table(), Product::column(product::Column::FarmerId))
                            .to(Farmer::table(), Farmer::column(farmer::Column::FarmerId))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_farmer_category")
                    .table(Product::table())
                    .col(Product::column(product::Column::FarmerId))
                    .col(Product::column(product::Column::Category))
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Product::table()).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Farmer::table()).to_owned())
            .await
    }
}
