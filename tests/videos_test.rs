mod common;

use axum::body::Bytes;
use axum_test::multipart::{MultipartForm, Part};
use common::{at, create_survey, create_user, session_cookie, setup_test_app, setup_test_app_with, TestApp};
use sea_orm::EntityTrait;
use serde_json::{json, Value};

use survey_dashboard::entities::{asset, survey, user, video};

async fn upload_for(app: &TestApp, owner: &user::Model) -> survey::Model {
    let survey = create_survey(&app.db, "s1", at("2024-01-01 00:00:00"), owner.user_id, None).await;
    let part = Part::bytes(Bytes::from_static(b"mp4"))
        .file_name("clip.mp4")
        .mime_type("video/mp4");
    let response = app
        .client()
        .post("/api/upload")
        .add_header("cookie", session_cookie(owner))
        .multipart(
            MultipartForm::new()
                .add_text("surveyId", survey.id.to_string())
                .add_part("file", part),
        )
        .await;
    assert_eq!(response.status_code(), 200);

    survey::Entity::find_by_id(survey.id).one(&app.db).await.unwrap().unwrap()
}

#[tokio::test]
async fn removing_deletes_video_asset_and_object() {
    let app = setup_test_app().await;
    let worker = create_user(&app.db, "user", None).await;
    let survey = upload_for(&app, &worker).await;
    let key = format!("{}/clip.mp4", survey.id);

    let response = app
        .client()
        .delete(&format!("/api/surveys/{}/video", survey.id))
        .add_header("cookie", session_cookie(&worker))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "Video removed", "surveyId": survey.id })
    );

    let reloaded = survey::Entity::find_by_id(survey.id).one(&app.db).await.unwrap().unwrap();
    assert!(!reloaded.is_video_uploaded);
    assert_eq!(reloaded.video_id, None);
    assert!(video::Entity::find().all(&app.db).await.unwrap().is_empty());
    assert!(asset::Entity::find().all(&app.db).await.unwrap().is_empty());
    assert!(app.store.keys().is_empty());
    assert_eq!(*app.store.deleted.lock().unwrap(), vec![key]);
}

#[tokio::test]
async fn detach_mode_keeps_the_video_row() {
    let app = setup_test_app_with(&[("VIDEO_REMOVAL_MODE", "detach")]).await;
    let worker = create_user(&app.db, "user", None).await;
    let survey = upload_for(&app, &worker).await;

    let response = app
        .client()
        .delete(&format!("/api/surveys/{}/video", survey.id))
        .add_header("cookie", session_cookie(&worker))
        .await;
    assert_eq!(response.status_code(), 200);

    let reloaded = survey::Entity::find_by_id(survey.id).one(&app.db).await.unwrap().unwrap();
    assert!(!reloaded.is_video_uploaded);
    assert_eq!(reloaded.video_id, None);
    assert_eq!(video::Entity::find().all(&app.db).await.unwrap().len(), 1);
    assert_eq!(app.store.keys().len(), 1);
}

#[tokio::test]
async fn removing_is_scoped_and_needs_a_video() {
    let app = setup_test_app().await;
    let owner = create_user(&app.db, "user", None).await;
    let stranger = create_user(&app.db, "user", None).await;
    let survey = upload_for(&app, &owner).await;
    let empty = create_survey(&app.db, "empty", at("2024-01-02 00:00:00"), owner.user_id, None).await;

    let response = app
        .client()
        .delete(&format!("/api/surveys/{}/video", survey.id))
        .add_header("cookie", session_cookie(&stranger))
        .await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["error"], "Survey not found");

    let response = app
        .client()
        .delete(&format!("/api/surveys/{}/video", empty.id))
        .add_header("cookie", session_cookie(&owner))
        .await;
    assert_eq!(response.status_code(), 404);

    let reloaded = survey::Entity::find_by_id(survey.id).one(&app.db).await.unwrap().unwrap();
    assert!(reloaded.is_video_uploaded);
}
