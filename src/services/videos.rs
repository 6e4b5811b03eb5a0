use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::config::VideoRemovalMode;
use crate::entities::{asset, survey, video};
use crate::services::storage::{object_key, ObjectStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The survey had no video attached.
    NothingAttached,
    Removed { video_id: Uuid, deleted: bool },
}

/// Drops a video that is no longer attached to its survey. In
/// [`VideoRemovalMode::Detach`] the row stays and nothing is returned; in
/// [`VideoRemovalMode::Delete`] the row and its asset mappings go and the
/// deleted row is returned so its stored object can be removed after commit.
pub(crate) async fn retire_video<C>(
    db: &C,
    video_id: Uuid,
    mode: VideoRemovalMode,
) -> Result<Option<video::Model>, DbErr>
where
    C: ConnectionTrait,
{
    if mode == VideoRemovalMode::Detach {
        return Ok(None);
    }

    asset::Entity::delete_many()
        .filter(asset::Column::VideoId.eq(video_id))
        .exec(db)
        .await?;
    let removed = video::Entity::find_by_id(video_id).one(db).await?;
    video::Entity::delete_by_id(video_id).exec(db).await?;

    Ok(removed)
}

/// Best-effort delete of a retired video's object. `keep_key` protects an
/// object that was just rewritten under the same key.
pub(crate) async fn delete_stored(storage: &dyn ObjectStore, video: &video::Model, keep_key: Option<&str>) {
    let key = object_key(video.survey_id, &video.name);
    if keep_key == Some(key.as_str()) {
        return;
    }
    if let Err(e) = storage.delete_object(&key).await {
        tracing::warn!(video = %video.id, "Failed to delete stored video: {}", e);
    }
}

/// Unlinks the survey's video and clears its uploaded flag. In
/// [`VideoRemovalMode::Delete`] the video row, its asset mappings and the
/// stored object go too; the object delete is best-effort.
pub async fn remove_video(
    db: &DatabaseConnection,
    storage: &dyn ObjectStore,
    survey: &survey::Model,
    mode: VideoRemovalMode,
) -> Result<Removal, DbErr> {
    let Some(video_id) = survey.video_id else {
        return Ok(Removal::NothingAttached);
    };

    let txn = db.begin().await?;

    let mut survey_active: survey::ActiveModel = survey.clone().into();
    survey_active.video_id = Set(None);
    survey_active.is_video_uploaded = Set(false);
    survey_active.update(&txn).await?;

    let removed_video = retire_video(&txn, video_id, mode).await?;

    txn.commit().await?;

    if let Some(video) = &removed_video {
        delete_stored(storage, video, None).await;
    }

    Ok(Removal::Removed {
        video_id,
        deleted: mode == VideoRemovalMode::Delete,
    })
}
