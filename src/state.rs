use std::sync::Arc;

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::mux::Transcoder;
use crate::services::storage::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn ObjectStore>,
    pub transcoder: Arc<dyn Transcoder>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
        config: Config,
    ) -> Self {
        Self {
            db,
            storage,
            transcoder,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
