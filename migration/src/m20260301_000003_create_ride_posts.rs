use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RidePost::Table)
                    .if_not_exists()
                    .col(uuid(RidePost::Id).primary_key())
                    .col(uuid(RidePost::CreatorId).not_null())
                    .col(string_len(RidePost::Departure, 255).not_null())
                    .col(string_len(RidePost::Destination, 255).not_null())
                    .col(timestamp_with_time_zone(RidePost::DepartureDatetime).not_null())
                    .col(integer(RidePost::SeatsAvailable).not_null().default(1))
                    // OPEN / FULL / CANCELLED / COMPLETED
                    .col(string_len(RidePost::Status, 16).not_null().default("OPEN"))
                    .col(
                        timestamp_with_time_zone(RidePost::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_post_creator")
                            .from(RidePost::Table, RidePost::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_post_creator")
                    .table(RidePost::Table)
                    .col(RidePost::CreatorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RidePost::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RidePost {
    Table,
    Id,
    CreatorId,
    Departure,
    Destination,
    DepartureDatetime,
    SeatsAvailable,
    Status,
    CreatedAt,
}
