use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "surveys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime,
    pub is_video_uploaded: bool,
    pub video_id: Option<Uuid>,
    pub gps_track_id: Option<Uuid>,
    pub user_id: Uuid,
    pub manager_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::video::Entity",
        from = "Column::VideoId",
        to = "super::video::Column::Id",
        on_delete = "SetNull"
    )]
    Video,
    #[sea_orm(
        belongs_to = "super::gps_track::Entity",
        from = "Column::GpsTrackId",
        to = "super::gps_track::Column::Id",
        on_delete = "SetNull"
    )]
    GpsTrack,
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl Related<super::gps_track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GpsTrack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
