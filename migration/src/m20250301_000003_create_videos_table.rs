use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Videos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Videos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Videos::SurveyId).uuid().not_null())
                    .col(ColumnDef::new(Videos::Name).string().not_null())
                    .col(ColumnDef::new(Videos::Url).string().not_null())
                    .col(ColumnDef::new(Videos::MuxAssetId).string().null())
                    .col(ColumnDef::new(Videos::MuxPlaybackId).string().null())
                    .col(ColumnDef::new(Videos::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_survey_id")
                    .table(Videos::Table)
                    .col(Videos::SurveyId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Videos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Id,
    SurveyId,
    Name,
    Url,
    MuxAssetId,
    MuxPlaybackId,
    CreatedAt,
}
