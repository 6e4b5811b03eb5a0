use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{gps_track, video};
use crate::error::AppError;
use crate::middleware::session::SessionUser;
use crate::pagination::PaginatedResponse;
use crate::services::surveys::{self, DateRange, SurveyListQuery, SurveyRow, UploadStatusFilter, PAGE_SIZE};
use crate::state::AppState;

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSurveysQuery {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Case-insensitive substring of the survey name.
    pub search: Option<String>,
    pub upload_status: Option<UploadStatusFilter>,
    /// Only applied together with `endDate`.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub mux_asset_id: Option<String>,
    /// HLS playback URL once processing has finished.
    pub mux_playback_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<video::Model> for VideoResponse {
    fn from(model: video::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            mux_asset_id: model.mux_asset_id,
            mux_playback_id: model.mux_playback_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GpsTrackResponse {
    pub id: Uuid,
    pub name: String,
    pub duration: String,
}

impl From<gps_track::Model> for GpsTrackResponse {
    fn from(model: gps_track::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            duration: model.duration,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub name: String,
    /// UTC
    pub timestamp: NaiveDateTime,
    pub is_video_uploaded: bool,
    pub video_id: Option<Uuid>,
    pub gps_track_id: Option<Uuid>,
    pub user_id: Uuid,
    pub manager_id: Option<Uuid>,
    pub video: Option<VideoResponse>,
    pub gps_track: Option<GpsTrackResponse>,
}

impl From<SurveyRow> for SurveyResponse {
    fn from(row: SurveyRow) -> Self {
        let survey = row.survey;
        Self {
            id: survey.id,
            name: survey.name,
            timestamp: survey.timestamp,
            is_video_uploaded: survey.is_video_uploaded,
            video_id: survey.video_id,
            gps_track_id: survey.gps_track_id,
            user_id: survey.user_id,
            manager_id: survey.manager_id,
            video: row.video.map(VideoResponse::from),
            gps_track: row.gps_track.map(GpsTrackResponse::from),
        }
    }
}

// GET /api/surveys
#[utoipa::path(
    get,
    path = "/api/surveys",
    params(
        ListSurveysQuery
    ),
    responses(
        (status = 200, description = "One page of visible surveys", body = PaginatedResponse<SurveyResponse>),
        (status = 400, description = "Invalid query parameters"),
        (status = 303, description = "No session, redirected to login"),
        (status = 500, description = "Failed to fetch surveys")
    ),
    security(
        ("session_cookie" = [])
    ),
    tag = "Surveys"
)]
pub async fn list_surveys(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Result<Query<ListSurveysQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<SurveyResponse>>, AppError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::warn!("Surveys | GET /api/surveys | res=400 | {}", rejection.body_text());
        AppError::BadRequest("Invalid query parameters".to_string())
    })?;

    let date_range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    };

    let list_query = SurveyListQuery {
        page: query.page.unwrap_or(1),
        search: query.search,
        upload_status: query.upload_status.unwrap_or_default(),
        date_range,
    };

    let page = surveys::list_surveys(&state.db, &user.viewer(), &list_query, state.config.display_offset)
        .await
        .map_err(|e| {
            tracing::error!("Surveys | GET /api/surveys | user={} | res=500 | {}", user.user_id, e);
            AppError::Upstream("Failed to fetch surveys".to_string())
        })?;

    tracing::info!(
        "Surveys | GET /api/surveys | user={} | page={} | count={} | res=200",
        user.user_id,
        page.page,
        page.count
    );

    let data = page.rows.into_iter().map(SurveyResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, page.count, page.page, PAGE_SIZE)))
}
