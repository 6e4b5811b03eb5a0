pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_gps_tracks_table;
mod m20250301_000003_create_videos_table;
mod m20250301_000004_create_surveys_table;
mod m20250302_000005_create_assets_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_gps_tracks_table::Migration),
            Box::new(m20250301_000003_create_videos_table::Migration),
            Box::new(m20250301_000004_create_surveys_table::Migration),
            Box::new(m20250302_000005_create_assets_table::Migration),
        ]
    }
}
