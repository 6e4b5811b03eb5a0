use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GpsTracks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GpsTracks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(GpsTracks::Name).string().not_null())
                    .col(ColumnDef::new(GpsTracks::Duration).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GpsTracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GpsTracks {
    Table,
    Id,
    Name,
    Duration,
}
