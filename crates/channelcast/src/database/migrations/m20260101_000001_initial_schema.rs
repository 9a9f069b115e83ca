use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// `uuid()` on Postgres, `string()` elsewhere (SQLite has no native uuid type).
fn id_column<T: IntoIden>(manager: &SchemaManager, col: T) -> ColumnDef {
    match manager.get_database_backend() {
        sea_orm::DatabaseBackend::Postgres => uuid(col),
        _ => string(col),
    }
}

/// Primary-key variant of [`id_column`].
fn pk_id_column<T: IntoIden>(manager: &SchemaManager, col: T) -> ColumnDef {
    id_column(manager, col).primary_key().not_null().to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Channels::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, Channels::Id))
                    .col(string_uniq(Channels::Slug))
                    .col(string(Channels::Name))
                    .col(string(Channels::OutputDir))
                    .col(integer(Channels::VideoBitrateKbps))
                    .col(integer(Channels::AudioBitrateKbps))
                    .col(string(Channels::Resolution))
                    .col(integer(Channels::Fps))
                    .col(integer(Channels::SegmentDuration))
                    .col(boolean(Channels::AutoStart))
                    .col(boolean(Channels::UseDynamicPlaylist))
                    .col(boolean(Channels::IncludeBumpers))
                    .col(string(Channels::State))
                    .col(integer(Channels::CurrentIndex))
                    .col(integer(Channels::ViewerCount))
                    .col(timestamp_with_time_zone_null(Channels::StartedAt))
                    .col(text_null(Channels::LastError))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaFiles::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, MediaFiles::Id))
                    .col(text(MediaFiles::Path))
                    .col(string(MediaFiles::Filename))
                    .col(double(MediaFiles::DurationSeconds))
                    .col(big_integer(MediaFiles::FileSize))
                    .col(string_null(MediaFiles::ShowName))
                    .col(integer_null(MediaFiles::Season))
                    .col(integer_null(MediaFiles::Episode))
                    .col(string_null(MediaFiles::Title))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Buckets::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, Buckets::Id))
                    .col(string(Buckets::Name))
                    .col(string(Buckets::BucketType))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BucketMedia::Table)
                    .if_not_exists()
                    .col(id_column(manager, BucketMedia::BucketId).not_null().to_owned())
                    .col(id_column(manager, BucketMedia::MediaId).not_null().to_owned())
                    .col(integer(BucketMedia::Position))
                    .primary_key(Index::create().col(BucketMedia::BucketId).col(BucketMedia::MediaId))
                    .foreign_key(
                        ForeignKey::create()
                            .from(BucketMedia::Table, BucketMedia::BucketId)
                            .to(Buckets::Table, Buckets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(BucketMedia::Table, BucketMedia::MediaId)
                            .to(MediaFiles::Table, MediaFiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChannelBuckets::Table)
                    .if_not_exists()
                    .col(id_column(manager, ChannelBuckets::ChannelId).not_null().to_owned())
                    .col(id_column(manager, ChannelBuckets::BucketId).not_null().to_owned())
                    .col(integer(ChannelBuckets::Priority))
                    .primary_key(
                        Index::create()
                            .col(ChannelBuckets::ChannelId)
                            .col(ChannelBuckets::BucketId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ChannelBuckets::Table, ChannelBuckets::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ChannelBuckets::Table, ChannelBuckets::BucketId)
                            .to(Buckets::Table, Buckets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduleBlocks::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, ScheduleBlocks::Id))
                    .col(id_column(manager, ScheduleBlocks::ChannelId).not_null().to_owned())
                    .col(string(ScheduleBlocks::DayOfWeek))
                    .col(string(ScheduleBlocks::StartTime))
                    .col(string(ScheduleBlocks::EndTime))
                    .col(id_column(manager, ScheduleBlocks::BucketId).not_null().to_owned())
                    .col(string(ScheduleBlocks::PlaybackMode))
                    .col(integer(ScheduleBlocks::Priority))
                    .col(boolean(ScheduleBlocks::Enabled))
                    .col(timestamp_with_time_zone(ScheduleBlocks::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScheduleBlocks::Table, ScheduleBlocks::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScheduleBlocks::Table, ScheduleBlocks::BucketId)
                            .to(Buckets::Table, Buckets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BucketProgression::Table)
                    .if_not_exists()
                    .col(id_column(manager, BucketProgression::ChannelId).not_null().to_owned())
                    .col(id_column(manager, BucketProgression::BucketId).not_null().to_owned())
                    .col(id_column(manager, BucketProgression::LastPlayedMediaId).to_owned())
                    .col(integer(BucketProgression::PositionInBucket))
                    .primary_key(
                        Index::create()
                            .col(BucketProgression::ChannelId)
                            .col(BucketProgression::BucketId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(BucketProgression::Table, BucketProgression::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlaybackSessions::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, PlaybackSessions::Id))
                    .col(id_column(manager, PlaybackSessions::ChannelId).not_null().to_owned())
                    .col(timestamp_with_time_zone(PlaybackSessions::StartedAt))
                    .col(timestamp_with_time_zone_null(PlaybackSessions::EndedAt))
                    .col(string(PlaybackSessions::Kind))
                    .col(string(PlaybackSessions::Trigger))
                    .foreign_key(
                        ForeignKey::create()
                            .from(PlaybackSessions::Table, PlaybackSessions::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduleStartTimes::Table)
                    .if_not_exists()
                    .col(pk_id_column(manager, ScheduleStartTimes::ChannelId))
                    .col(timestamp_with_time_zone(ScheduleStartTimes::StartedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScheduleStartTimes::Table, ScheduleStartTimes::ChannelId)
                            .to(Channels::Table, Channels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(string(Settings::Key).primary_key())
                    .col(text(Settings::Value))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_schedule_blocks_channel")
                    .table(ScheduleBlocks::Table)
                    .col(ScheduleBlocks::ChannelId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Settings::Table).to_owned()).await?;
        manager
            .drop_table(Table::drop().table(ScheduleStartTimes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlaybackSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BucketProgression::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScheduleBlocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChannelBuckets::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(BucketMedia::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Buckets::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MediaFiles::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Channels::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Channels {
    Table,
    Id,
    Slug,
    Name,
    OutputDir,
    VideoBitrateKbps,
    AudioBitrateKbps,
    Resolution,
    Fps,
    SegmentDuration,
    AutoStart,
    UseDynamicPlaylist,
    IncludeBumpers,
    State,
    CurrentIndex,
    ViewerCount,
    StartedAt,
    LastError,
}

#[derive(DeriveIden)]
enum MediaFiles {
    Table,
    Id,
    Path,
    Filename,
    DurationSeconds,
    FileSize,
    ShowName,
    Season,
    Episode,
    Title,
}

#[derive(DeriveIden)]
enum Buckets {
    Table,
    Id,
    Name,
    BucketType,
}

#[derive(DeriveIden)]
enum BucketMedia {
    Table,
    BucketId,
    MediaId,
    Position,
}

#[derive(DeriveIden)]
enum ChannelBuckets {
    Table,
    ChannelId,
    BucketId,
    Priority,
}

#[derive(DeriveIden)]
enum ScheduleBlocks {
    Table,
    Id,
    ChannelId,
    DayOfWeek,
    StartTime,
    EndTime,
    BucketId,
    PlaybackMode,
    Priority,
    Enabled,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BucketProgression {
    Table,
    ChannelId,
    BucketId,
    PositionInBucket,
}

#[derive(DeriveIden)]
enum PlaybackSessions {
    Table,
    Id,
    ChannelId,
    StartedAt,
    EndedAt,
    Kind,
    Trigger,
}

#[derive(DeriveIden)]
enum ScheduleStartTimes {
    Table,
    ChannelId,
    StartedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
}
