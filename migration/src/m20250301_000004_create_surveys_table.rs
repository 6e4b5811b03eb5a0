use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Surveys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Surveys::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Surveys::Name).string().not_null())
                    .col(ColumnDef::new(Surveys::Timestamp).timestamp().not_null())
                    .col(
                        ColumnDef::new(Surveys::IsVideoUploaded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Surveys::VideoId).uuid().null())
                    .col(ColumnDef::new(Surveys::GpsTrackId).uuid().null())
                    .col(ColumnDef::new(Surveys::UserId).uuid().not_null())
                    .col(ColumnDef::new(Surveys::ManagerId).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_surveys_video_id")
                            .from(Surveys::Table, Surveys::VideoId)
                            .to(Videos::Table, Videos::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_surveys_gps_track_id")
                            .from(Surveys::Table, Surveys::GpsTrackId)
                            .to(GpsTracks::Table, GpsTracks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_surveys_timestamp")
                    .table(Surveys::Table)
                    .col(Surveys::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_surveys_user_id")
                    .table(Surveys::Table)
                    .col(Surveys::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Surveys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Surveys {
    Table,
    Id,
    Name,
    Timestamp,
    IsVideoUploaded,
    VideoId,
    GpsTrackId,
    UserId,
    ManagerId,
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum GpsTracks {
    Table,
    Id,
}
