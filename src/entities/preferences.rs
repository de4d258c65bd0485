use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trip-planning preferences, one row per user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    /// Minutes.
    pub max_walking_time: i32,
    /// 0-100.
    pub budget_sensitivity: i32,
    pub use_by_default: bool,
    pub prefer_transit: bool,
    pub prefer_bike: bool,
    pub prefer_carpool: bool,
    pub prefer_driving: bool,
    pub prefer_walking: bool,
    pub wheelchair_accessible: bool,
    pub elevator_required: bool,
    pub avoid_stairs: bool,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
