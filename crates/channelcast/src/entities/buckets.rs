use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "buckets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub bucket_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bucket_media::Entity")]
    BucketMedia,
    #[sea_orm(has_many = "super::channel_buckets::Entity")]
    ChannelBuckets,
    #[sea_orm(has_many = "super::schedule_blocks::Entity")]
    ScheduleBlocks,
}

impl Related<super::bucket_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BucketMedia.def()
    }
}

impl Related<super::channel_buckets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChannelBuckets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
