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
                    .table(UserPreferences::Table)
                    .if_not_exists()
                    .col(uuid(UserPreferences::Id).primary_key())
                    .col(uuid(UserPreferences::UserId).not_null().unique_key())
                    .col(integer(UserPreferences::MaxWalkingTime).not_null().default(15))
                    .col(integer(UserPreferences::BudgetSensitivity).not_null().default(50))
                    .col(boolean(UserPreferences::UseByDefault).not_null().default(true))
                    .col(boolean(UserPreferences::PreferTransit).not_null().default(true))
                    .col(boolean(UserPreferences::PreferBike).not_null().default(true))
                    .col(boolean(UserPreferences::PreferCarpool).not_null().default(false))
                    .col(boolean(UserPreferences::PreferDriving).not_null().default(false))
                    .col(boolean(UserPreferences::PreferWalking).not_null().default(true))
                    .col(boolean(UserPreferences::WheelchairAccessible).not_null().default(false))
                    .col(boolean(UserPreferences::ElevatorRequired).not_null().default(false))
                    .col(boolean(UserPreferences::AvoidStairs).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(UserPreferences::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_preferences_user")
                            .from(UserPreferences::Table, UserPreferences::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserPreferences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum UserPreferences {
    Table,
    Id,
    UserId,
    MaxWalkingTime,
    BudgetSensitivity,
    UseByDefault,
    PreferTransit,
    PreferBike,
    PreferCarpool,
    PreferDriving,
    PreferWalking,
    WheelchairAccessible,
    ElevatorRequired,
    AvoidStairs,
    UpdatedAt,
}
