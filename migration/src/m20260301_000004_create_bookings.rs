use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_users::User;
use super::m20260301_000003_create_ride_posts::RidePost;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::RidePostId).not_null())
                    .col(uuid(Booking::PassengerId).not_null())
                    .col(integer(Booking::SeatsRequested).not_null().default(1))
                    // PENDING / ACCEPTED / REJECTED / CANCELLED
                    .col(string_len(Booking::Status, 16).not_null().default("PENDING"))
                    .col(double_null(Booking::MatchedScore))
                    .col(
                        timestamp_with_time_zone(Booking::StatusUpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_ride_post")
                            .from(Booking::Table, Booking::RidePostId)
                            .to(RidePost::Table, RidePost::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_passenger")
                            .from(Booking::Table, Booking::PassengerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_ride_post")
                    .table(Booking::Table)
                    .col(Booking::RidePostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_passenger")
                    .table(Booking::Table)
                    .col(Booking::PassengerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    #[sea_orm(iden = "carpool_booking")]
    Table,
    Id,
    RidePostId,
    PassengerId,
    SeatsRequested,
    Status,
    MatchedScore,
    StatusUpdatedAt,
    CreatedAt,
}
