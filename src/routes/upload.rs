use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::session::SessionUser;
use crate::services::surveys::find_visible;
use crate::services::upload::{FileUpload, UploadOrchestrator, UploadOutcome};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub public_url: String,
    pub video_id: Uuid,
    /// Transcoding asset created for the stored file.
    pub asset_id: String,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            public_url: outcome.public_url,
            video_id: outcome.video_id,
            asset_id: outcome.asset_id,
        }
    }
}

pub(crate) fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the size limit".to_string())
    } else {
        AppError::BadRequest("Invalid multipart data".to_string())
    }
}

/// Buffers one `file` field.
pub(crate) async fn read_file(field: Field<'_>) -> Result<FileUpload, AppError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(FileUpload {
        filename,
        content_type,
        data: data.to_vec(),
    })
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Fields `file` and `surveyId`"),
    responses(
        (status = 200, description = "File stored, video attached and submitted for processing", body = UploadResponse),
        (status = 400, description = "Missing file or surveyId, or invalid surveyId"),
        (status = 404, description = "Survey not found"),
        (status = 413, description = "Upload exceeds the size limit"),
        (status = 500, description = "Storage, database or processing failure")
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file = None;
    let mut survey_id = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" if file.is_none() => file = Some(read_file(field).await?),
            "surveyId" => {
                let text = field.text().await.map_err(multipart_error)?;
                let text = text.trim();
                if !text.is_empty() {
                    survey_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let (Some(file), Some(survey_id)) = (file, survey_id) else {
        tracing::info!("Upload | POST /api/upload | user={} | res=400 | Missing file or surveyId", user.user_id);
        return Err(AppError::BadRequest("Missing file or surveyId".to_string()));
    };

    let Ok(survey_id) = Uuid::parse_str(&survey_id) else {
        tracing::info!("Upload | POST /api/upload | user={} | res=400 | Invalid surveyId", user.user_id);
        return Err(AppError::BadRequest("Invalid surveyId".to_string()));
    };

    let Some(survey) = find_visible(&state.db, &user.viewer(), survey_id).await? else {
        tracing::info!("Upload | POST /api/upload | survey={} | res=404", survey_id);
        return Err(AppError::NotFound("Survey not found".to_string()));
    };

    let outcome = UploadOrchestrator::from_state(&state)
        .upload(&survey, file)
        .await
        .inspect_err(|_| tracing::info!("Upload | POST /api/upload | survey={} | res=500", survey.id))?;

    tracing::info!(
        "Upload | POST /api/upload | survey={} | video={} | asset={} | res=200",
        survey.id,
        outcome.video_id,
        outcome.asset_id
    );
    Ok(Json(outcome.into()))
}
