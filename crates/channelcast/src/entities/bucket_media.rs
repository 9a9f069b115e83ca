//! Join table ordering media within a bucket; `position` defines playback order.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bucket_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bucket_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub media_id: Uuid,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::buckets::Entity",
        from = "Column::BucketId",
        to = "super::buckets::Column::Id"
    )]
    Bucket,
    #[sea_orm(
        belongs_to = "super::media_files::Entity",
        from = "Column::MediaId",
        to = "super::media_files::Column::Id"
    )]
    MediaFile,
}

impl Related<super::buckets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bucket.def()
    }
}

impl Related<super::media_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaFile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
