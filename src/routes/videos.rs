use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::session::SessionUser;
use crate::routes::upload::{multipart_error, read_file};
use crate::services::surveys::find_visible;
use crate::services::upload::UploadOrchestrator;
use crate::services::videos::{self, Removal};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Done,
    Error,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchUploadResponse {
    /// One entry per uploaded file, in submission order.
    pub results: Vec<FileResult>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVideoResponse {
    pub message: String,
    pub survey_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/api/surveys/{id}/videos",
    tag = "Upload",
    params(
        ("id" = Uuid, Path, description = "Survey ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "One or more `file` fields"),
    responses(
        (status = 200, description = "Per-file outcome", body = BatchUploadResponse),
        (status = 400, description = "No file in the request"),
        (status = 404, description = "Survey not found"),
        (status = 413, description = "Upload exceeds the size limit")
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn upload_videos(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(survey_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, AppError> {
    let Some(survey) = find_visible(&state.db, &user.viewer(), survey_id).await? else {
        tracing::info!("Upload | POST /api/surveys/{}/videos | res=404", survey_id);
        return Err(AppError::NotFound("Survey not found".to_string()));
    };

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            files.push(read_file(field).await?);
        }
    }

    if files.is_empty() {
        tracing::info!("Upload | POST /api/surveys/{}/videos | res=400 | No file provided", survey_id);
        return Err(AppError::BadRequest("No file provided".to_string()));
    }

    let total = files.len();
    let outcomes = UploadOrchestrator::from_state(&state)
        .upload_many(&survey, files, state.config.upload_concurrency)
        .await;

    let results: Vec<FileResult> = outcomes
        .into_iter()
        .map(|(filename, result)| match result {
            Ok(outcome) => FileResult {
                filename,
                status: FileStatus::Done,
                public_url: Some(outcome.public_url),
                video_id: Some(outcome.video_id),
                asset_id: Some(outcome.asset_id),
                error: None,
            },
            Err(e) => FileResult {
                filename,
                status: FileStatus::Error,
                public_url: None,
                video_id: None,
                asset_id: None,
                error: Some(e.public_message().to_string()),
            },
        })
        .collect();

    let done = results.iter().filter(|r| r.status == FileStatus::Done).count();
    tracing::info!(
        "Upload | POST /api/surveys/{}/videos | files={} | done={} | res=200",
        survey_id,
        total,
        done
    );

    Ok(Json(BatchUploadResponse { results }))
}

#[utoipa::path(
    delete,
    path = "/api/surveys/{id}/video",
    tag = "Upload",
    params(
        ("id" = Uuid, Path, description = "Survey ID")
    ),
    responses(
        (status = 200, description = "Video removed from the survey", body = RemoveVideoResponse),
        (status = 404, description = "Survey not found or has no video")
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn remove_video(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<RemoveVideoResponse>, AppError> {
    let Some(survey) = find_visible(&state.db, &user.viewer(), survey_id).await? else {
        tracing::info!("Videos | DELETE /api/surveys/{}/video | res=404", survey_id);
        return Err(AppError::NotFound("Survey not found".to_string()));
    };

    let removal = videos::remove_video(
        &state.db,
        state.storage.as_ref(),
        &survey,
        state.config.video_removal_mode,
    )
    .await?;

    match removal {
        Removal::NothingAttached => {
            tracing::info!("Videos | DELETE /api/surveys/{}/video | res=404 | no video", survey_id);
            Err(AppError::NotFound("Survey has no video".to_string()))
        }
        Removal::Removed { video_id, deleted } => {
            tracing::info!(
                "Videos | DELETE /api/surveys/{}/video | video={} | deleted={} | res=200",
                survey_id,
                video_id,
                deleted
            );
            Ok(Json(RemoveVideoResponse {
                message: "Video removed".to_string(),
                survey_id,
            }))
        }
    }
}
