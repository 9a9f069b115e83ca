use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "media_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub path: String,
    pub filename: String,
    pub duration_seconds: f64,
    pub file_size: i64,
    pub show_name: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub title: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bucket_media::Entity")]
    BucketMedia,
}

impl Related<super::bucket_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BucketMedia.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
