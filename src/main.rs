use std::sync::Arc;

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use survey_dashboard::config::{Config, ConfigError};
use survey_dashboard::routes::create_routes;
use survey_dashboard::services::mux::MuxClient;
use survey_dashboard::services::s3::S3Service;
use survey_dashboard::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Survey video dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run pending migrations and serve the HTTP API (default)
    Serve,
    /// Manage the database schema
    Migrate {
        #[command(subcommand)]
        action: Option<MigrateAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum MigrateAction {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the latest migration
    Down,
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("survey_dashboard=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate { action } => {
            let database_url =
                std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
            let db = Database::connect(database_url.as_str()).await?;

            match action.unwrap_or(MigrateAction::Up) {
                MigrateAction::Up => Migrator::up(&db, None).await?,
                MigrateAction::Down => Migrator::down(&db, Some(1)).await?,
                MigrateAction::Status => Migrator::status(&db).await?,
            }
            tracing::info!("Migrations finished");
            Ok(())
        }
        Command::Serve => {
            let config = Config::from_env()?;
            let db = Database::connect(config.database_url.as_str()).await?;
            Migrator::up(&db, None).await?;

            let storage = S3Service::new(&config).await;
            let transcoder = MuxClient::new(&config);
            tracing::info!("Storing uploads in bucket {}", storage.bucket_name);

            let bind_addr = config.bind_addr.clone();
            let state = AppState::new(db, Arc::new(storage), Arc::new(transcoder), config);
            let app = create_routes(state);

            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            tracing::info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
