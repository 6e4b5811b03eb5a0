#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::NaiveDateTime;
use migration::{Migrator, MigratorTrait};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

use survey_dashboard::config::Config;
use survey_dashboard::entities::{gps_track, survey, user, video};
use survey_dashboard::routes::create_routes;
use survey_dashboard::services::mux::{TranscodeError, Transcoder};
use survey_dashboard::services::storage::{ObjectStore, StorageError};
use survey_dashboard::state::AppState;

pub const PUBLIC_BASE: &str = "https://cdn.test";
pub const STREAM_BASE: &str = "https://stream.test";

/// Object store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_puts: AtomicBool,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: "bucket unavailable".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", PUBLIC_BASE, key)
    }
}

/// Transcoder that hands out sequential asset ids and records its inputs.
/// `peak` is the highest number of `create_asset` calls seen in flight.
#[derive(Default)]
pub struct FakeTranscoder {
    pub inputs: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub peak: AtomicUsize,
    in_flight: AtomicUsize,
    counter: AtomicUsize,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn create_asset(&self, input_url: &str) -> Result<String, TranscodeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(TranscodeError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.inputs.lock().unwrap().push(input_url.to_string());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("asset-{}", n))
    }

    fn playback_url(&self, playback_id: &str) -> String {
        format!("{}/{}.m3u8", STREAM_BASE, playback_id)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: DatabaseConnection,
    pub store: Arc<MemoryStore>,
    pub transcoder: Arc<FakeTranscoder>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ("S3_BUCKET_NAME".to_string(), "surveys".to_string()),
        ("MUX_TOKEN_ID".to_string(), "token-id".to_string()),
        ("MUX_TOKEN_SECRET".to_string(), "token-secret".to_string()),
        ("MUX_STREAM_BASE".to_string(), STREAM_BASE.to_string()),
    ]);
    for (name, value) in overrides {
        vars.insert(name.to_string(), value.to_string());
    }
    Config::from_lookup(|name| vars.get(name).cloned()).expect("test config should be valid")
}

pub async fn connect_test_db() -> DatabaseConnection {
    // One long-lived connection: every new SQLite memory connection is a fresh database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.expect("Failed to connect to test database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let db = connect_test_db().await;
    let store = Arc::new(MemoryStore::default());
    let transcoder = Arc::new(FakeTranscoder::default());

    let state = AppState::new(db.clone(), store.clone(), transcoder.clone(), test_config(overrides));
    let server = TestServer::new(create_routes(state).into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        db,
        store,
        transcoder,
    }
}

pub fn session_cookie(user: &user::Model) -> String {
    let record = json!({
        "user_id": user.user_id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
    });
    format!("user={}", utf8_percent_encode(&record.to_string(), NON_ALPHANUMERIC))
}

pub async fn create_user(db: &DatabaseConnection, role: &str, manager_id: Option<Uuid>) -> user::Model {
    let id = Uuid::new_v4();
    user::ActiveModel {
        user_id: Set(id),
        username: Set(format!("{}-{}", role, &id.to_string()[..8])),
        email: Set(format!("{}@surveys.test", id)),
        role: Set(role.to_string()),
        location: Set(None),
        manager_id: Set(manager_id),
        password: Set("not-used".to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub fn at(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").expect("bad timestamp literal")
}

pub async fn create_survey(
    db: &DatabaseConnection,
    name: &str,
    timestamp: NaiveDateTime,
    owner: Uuid,
    manager: Option<Uuid>,
) -> survey::Model {
    survey::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        timestamp: Set(timestamp),
        is_video_uploaded: Set(false),
        video_id: Set(None),
        gps_track_id: Set(None),
        user_id: Set(owner),
        manager_id: Set(manager),
    }
    .insert(db)
    .await
    .expect("Failed to insert survey")
}

/// Gives an existing survey a stored video, the way a finished upload would.
pub async fn attach_video(db: &DatabaseConnection, survey: &survey::Model) -> video::Model {
    let video = video::ActiveModel {
        id: Set(Uuid::new_v4()),
        survey_id: Set(survey.id),
        name: Set("clip.mp4".to_string()),
        url: Set(format!("{}/{}/clip.mp4", PUBLIC_BASE, survey.id)),
        mux_asset_id: Set(None),
        mux_playback_id: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .expect("Failed to insert video");

    let mut active: survey::ActiveModel = survey.clone().into();
    active.video_id = Set(Some(video.id));
    active.is_video_uploaded = Set(true);
    active.update(db).await.expect("Failed to attach video");

    video
}

pub async fn attach_gps_track(db: &DatabaseConnection, survey: &survey::Model, name: &str) -> gps_track::Model {
    let track = gps_track::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        duration: Set("00:42:10".to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to insert gps track");

    let mut active: survey::ActiveModel = survey.clone().into();
    active.gps_track_id = Set(Some(track.id));
    active.update(db).await.expect("Failed to attach gps track");

    track
}
