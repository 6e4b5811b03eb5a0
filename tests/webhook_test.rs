mod common;

use axum::body::Bytes;
use axum_test::multipart::{MultipartForm, Part};
use common::{at, create_survey, create_user, session_cookie, setup_test_app, setup_test_app_with, TestApp, STREAM_BASE};
use hmac::{Hmac, Mac};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use survey_dashboard::entities::{asset, video};
use survey_dashboard::routes::SIGNATURE_HEADER;

/// Uploads one file through the API and returns (video id, asset id).
async fn uploaded_video(app: &TestApp) -> (Uuid, String) {
    let worker = create_user(&app.db, "user", None).await;
    let survey = create_survey(&app.db, "s1", at("2024-01-01 00:00:00"), worker.user_id, None).await;

    let part = Part::bytes(Bytes::from_static(b"mp4"))
        .file_name("clip.mp4")
        .mime_type("video/mp4");
    let body: Value = app
        .client()
        .post("/api/upload")
        .add_header("cookie", session_cookie(&worker))
        .multipart(
            MultipartForm::new()
                .add_text("surveyId", survey.id.to_string())
                .add_part("file", part),
        )
        .await
        .json();

    let video_id = Uuid::parse_str(body["videoId"].as_str().expect("videoId")).expect("uuid");
    (video_id, body["assetId"].as_str().expect("assetId").to_string())
}

async fn post_event(app: &TestApp, event: &Value) -> (u16, Value) {
    let response = app
        .client()
        .post("/api/mux/webhook")
        .content_type("application/json")
        .bytes(Bytes::from(event.to_string()))
        .await;
    (response.status_code().as_u16(), response.json())
}

async fn playback_of(app: &TestApp, video_id: Uuid) -> Option<String> {
    video::Entity::find_by_id(video_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .mux_playback_id
}

#[tokio::test]
async fn ready_event_sets_playback_url_idempotently() {
    let app = setup_test_app().await;
    let (video_id, asset_id) = uploaded_video(&app).await;

    let event = json!({
        "type": "video.upload.ready",
        "object": { "id": asset_id },
        "playback_ids": [{ "id": "pb-42" }]
    });

    let (status, body) = post_event(&app, &event).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "received": true }));
    let expected = format!("{}/pb-42.m3u8", STREAM_BASE);
    assert_eq!(playback_of(&app, video_id).await, Some(expected.clone()));

    let (status, _) = post_event(&app, &event).await;
    assert_eq!(status, 200);
    assert_eq!(playback_of(&app, video_id).await, Some(expected));
    assert_eq!(video::Entity::find().all(&app.db).await.unwrap().len(), 1);
    assert_eq!(asset::Entity::find().all(&app.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn asset_ready_event_reads_the_data_body() {
    let app = setup_test_app().await;
    let (video_id, asset_id) = uploaded_video(&app).await;

    let event = json!({
        "type": "video.asset.ready",
        "data": { "id": asset_id, "playback_ids": [{ "id": "pb-7", "policy": "public" }] }
    });

    let (status, _) = post_event(&app, &event).await;
    assert_eq!(status, 200);
    assert_eq!(playback_of(&app, video_id).await, Some(format!("{}/pb-7.m3u8", STREAM_BASE)));
}

#[tokio::test]
async fn errored_and_unknown_events_change_nothing() {
    let app = setup_test_app().await;
    let (video_id, asset_id) = uploaded_video(&app).await;

    let errored = json!({ "type": "video.asset.errored", "object": { "id": asset_id } });
    let (status, body) = post_event(&app, &errored).await;
    assert_eq!(status, 200);
    assert_eq!(body["received"], true);

    let other = json!({ "type": "video.asset.created", "object": { "id": asset_id } });
    let (status, _) = post_event(&app, &other).await;
    assert_eq!(status, 200);

    assert_eq!(playback_of(&app, video_id).await, None);
}

#[tokio::test]
async fn ready_event_for_unmapped_asset_is_acknowledged() {
    let app = setup_test_app().await;

    let event = json!({
        "type": "video.upload.ready",
        "object": { "id": "asset-nobody-knows" },
        "playback_ids": [{ "id": "pb-1" }]
    });
    let (status, body) = post_event(&app, &event).await;
    assert_eq!(status, 200);
    assert_eq!(body["received"], true);
    assert!(video::Entity::find().all(&app.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_payloads_fail() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/mux/webhook")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;
    assert_eq!(response.status_code(), 500);
    assert_eq!(response.json::<Value>(), json!({ "error": "Webhook handling failed" }));

    let (status, _) = post_event(&app, &json!({ "object": { "id": "a" } })).await;
    assert_eq!(status, 500);
}

#[tokio::test]
async fn mapped_ready_event_without_playback_id_fails() {
    let app = setup_test_app().await;
    let (video_id, asset_id) = uploaded_video(&app).await;

    let event = json!({ "type": "video.upload.ready", "object": { "id": asset_id } });
    let (status, body) = post_event(&app, &event).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Webhook handling failed");
    assert_eq!(playback_of(&app, video_id).await, None);
}

#[tokio::test]
async fn signed_webhooks_are_verified_when_a_secret_is_configured() {
    let app = setup_test_app_with(&[("MUX_WEBHOOK_SECRET", "whsec_test")]).await;
    let body = json!({ "type": "video.asset.created" }).to_string();

    let response = app
        .client()
        .post("/api/mux/webhook")
        .bytes(Bytes::from(body.clone()))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(response.json::<Value>()["error"], "Invalid webhook signature");

    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec_test").unwrap();
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let response = app
        .client()
        .post("/api/mux/webhook")
        .add_header(SIGNATURE_HEADER, format!("t={},v1={}", timestamp, signature))
        .bytes(Bytes::from(body))
        .await;
    assert_eq!(response.status_code(), 200);
}
