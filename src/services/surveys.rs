//! Role-scoped, filtered and paginated survey queries.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, LoaderTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::user::Role;
use crate::entities::{gps_track, survey, video};

pub const PAGE_SIZE: u64 = 10;

/// Identity and role of whoever is asking; decides which surveys are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub role: Role,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
pub enum UploadStatusFilter {
    #[default]
    All,
    Uploaded,
    #[serde(rename = "Not Uploaded")]
    NotUploaded,
}

/// Inclusive range of calendar days in the viewer's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Start of the first day and the last millisecond of the final day,
    /// expressed in UTC.
    pub fn utc_bounds(&self, offset: FixedOffset) -> (NaiveDateTime, NaiveDateTime) {
        let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self.end.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
        (start - shift, end - shift)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurveyListQuery {
    /// 1-based; anything below 1 reads as the first page.
    pub page: u64,
    pub search: Option<String>,
    pub upload_status: UploadStatusFilter,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone)]
pub struct SurveyRow {
    pub survey: survey::Model,
    pub video: Option<video::Model>,
    pub gps_track: Option<gps_track::Model>,
}

#[derive(Debug, Clone)]
pub struct SurveyPage {
    pub rows: Vec<SurveyRow>,
    pub count: u64,
    pub page: u64,
}

pub fn visibility(viewer: &Viewer) -> Condition {
    match viewer.role {
        Role::Admin => Condition::all(),
        Role::Manager => Condition::all()
            .add(survey::Column::UserId.eq(viewer.user_id))
            .add(survey::Column::ManagerId.eq(viewer.user_id)),
        Role::User => Condition::all().add(survey::Column::UserId.eq(viewer.user_id)),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Role scope, then name, then upload status, then date range.
pub fn filter_condition(viewer: &Viewer, query: &SurveyListQuery, offset: FixedOffset) -> Condition {
    let mut condition = visibility(viewer);

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        condition = condition.add(
            Expr::expr(Func::lower(Expr::col((survey::Entity, survey::Column::Name))))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    match query.upload_status {
        UploadStatusFilter::All => {}
        UploadStatusFilter::Uploaded => {
            condition = condition.add(survey::Column::IsVideoUploaded.eq(true));
        }
        UploadStatusFilter::NotUploaded => {
            condition = condition.add(survey::Column::IsVideoUploaded.eq(false));
        }
    }

    if let Some(range) = query.date_range {
        let (start, end) = range.utc_bounds(offset);
        condition = condition
            .add(survey::Column::Timestamp.gte(start))
            .add(survey::Column::Timestamp.lte(end));
    }

    condition
}

/// Counts the matches first and only fetches rows when the requested page
/// starts inside the result set.
pub async fn list_surveys<C>(
    db: &C,
    viewer: &Viewer,
    query: &SurveyListQuery,
    offset: FixedOffset,
) -> Result<SurveyPage, DbErr>
where
    C: ConnectionTrait,
{
    let page = query.page.max(1);

    let paginator = survey::Entity::find()
        .filter(filter_condition(viewer, query, offset))
        .order_by_desc(survey::Column::Timestamp)
        .order_by_desc(survey::Column::Id)
        .paginate(db, PAGE_SIZE);

    let count = paginator.num_items().await?;
    let start = (page - 1).saturating_mul(PAGE_SIZE);
    if start >= count {
        return Ok(SurveyPage {
            rows: vec![],
            count,
            page,
        });
    }

    let surveys = paginator.fetch_page(page - 1).await?;
    let videos = surveys.load_one(video::Entity, db).await?;
    let gps_tracks = surveys.load_one(gps_track::Entity, db).await?;

    let rows = surveys
        .into_iter()
        .zip(videos)
        .zip(gps_tracks)
        .map(|((survey, video), gps_track)| SurveyRow {
            survey,
            video,
            gps_track,
        })
        .collect();

    Ok(SurveyPage { rows, count, page })
}

/// The survey if it exists and the viewer may see it.
pub async fn find_visible<C>(db: &C, viewer: &Viewer, survey_id: Uuid) -> Result<Option<survey::Model>, DbErr>
where
    C: ConnectionTrait,
{
    survey::Entity::find_by_id(survey_id)
        .filter(visibility(viewer))
        .one(db)
        .await
}
