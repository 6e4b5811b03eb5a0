//! Upload pipeline: object storage, video row, survey flag, transcoding asset.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use thiserror::Error;
use uuid::Uuid;

use crate::config::VideoRemovalMode;
use crate::entities::{asset, survey, video};
use crate::error::AppError;
use crate::services::mux::{TranscodeError, Transcoder};
use crate::services::storage::{object_key, sanitize_filename, ObjectStore, StorageError};
use crate::services::videos::{delete_stored, retire_video};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("storing the file failed: {0}")]
    Storage(#[from] StorageError),
    #[error("recording the upload failed: {0}")]
    Database(#[from] DbErr),
    #[error("submitting the video for processing failed: {0}")]
    Transcode(#[from] TranscodeError),
}

impl UploadError {
    /// Message returned to clients; the full error is only logged.
    pub fn public_message(&self) -> &'static str {
        match self {
            UploadError::Storage(_) => "Failed to upload file to storage",
            UploadError::Database(_) => "Failed to record uploaded video",
            UploadError::Transcode(_) => "Failed to submit video for processing",
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        tracing::error!("Upload failed: {}", err);
        AppError::Upstream(err.public_message().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub video_id: Uuid,
    pub public_url: String,
    pub asset_id: String,
}

#[derive(Clone)]
pub struct UploadOrchestrator {
    db: DatabaseConnection,
    storage: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn Transcoder>,
    removal_mode: VideoRemovalMode,
}

impl UploadOrchestrator {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
        removal_mode: VideoRemovalMode,
    ) -> Self {
        Self {
            db,
            storage,
            transcoder,
            removal_mode,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.storage.clone(),
            state.transcoder.clone(),
            state.config.video_removal_mode,
        )
    }

    /// Runs every step for one file in order and stops at the first failure.
    /// Completed steps are not rolled back.
    pub async fn upload(&self, survey: &survey::Model, file: FileUpload) -> Result<UploadOutcome, UploadError> {
        let filename = sanitize_filename(&file.filename);
        let key = object_key(survey.id, &filename);

        self.storage.put_object(&key, file.data, &file.content_type).await?;
        let public_url = self.storage.public_url(&key);
        tracing::debug!(survey = %survey.id, key = %key, "Stored upload");

        let (video_id, replaced) = self.attach_video(survey.id, &filename, &public_url).await?;
        tracing::debug!(survey = %survey.id, video = %video_id, "Survey marked uploaded");
        if let Some(old) = &replaced {
            tracing::info!(survey = %survey.id, video = %old.id, "Deleted replaced video");
            delete_stored(self.storage.as_ref(), old, Some(&key)).await;
        }

        let asset_id = self.transcoder.create_asset(&public_url).await?;
        if self.record_asset(video_id, &asset_id).await? {
            tracing::debug!(video = %video_id, asset = %asset_id, "Transcoding asset recorded");
        } else {
            tracing::info!(video = %video_id, asset = %asset_id, "Video replaced before its asset was recorded");
        }

        Ok(UploadOutcome {
            video_id,
            public_url,
            asset_id,
        })
    }

    /// Uploads files for one survey with at most `concurrency` in flight.
    /// Results come back in input order, one per file.
    pub async fn upload_many(
        &self,
        survey: &survey::Model,
        files: Vec<FileUpload>,
        concurrency: usize,
    ) -> Vec<(String, Result<UploadOutcome, UploadError>)> {
        stream::iter(files)
            .map(|file| async move {
                let filename = file.filename.clone();
                let result = self.upload(survey, file).await;
                if let Err(e) = &result {
                    tracing::warn!(survey = %survey.id, file = %filename, "Upload failed: {}", e);
                }
                (filename, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Inserts the video and points the survey at it in one transaction, so
    /// the uploaded flag never refers to a missing video. The video it
    /// replaces is retired in the same transaction per the removal mode and
    /// returned when its row was deleted.
    async fn attach_video(
        &self,
        survey_id: Uuid,
        filename: &str,
        public_url: &str,
    ) -> Result<(Uuid, Option<video::Model>), DbErr> {
        let txn = self.db.begin().await?;

        // Re-read so concurrent uploads to one survey see each other's video.
        let survey = survey::Entity::find_by_id(survey_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("survey {}", survey_id)))?;
        let previous = survey.video_id;

        let video = video::ActiveModel {
            id: Set(Uuid::new_v4()),
            survey_id: Set(survey.id),
            name: Set(filename.to_string()),
            url: Set(public_url.to_string()),
            mux_asset_id: Set(None),
            mux_playback_id: Set(None),
            created_at: Set(chrono::Utc::now().naive_utc()),
        }
        .insert(&txn)
        .await?;

        let mut survey_active: survey::ActiveModel = survey.into();
        survey_active.video_id = Set(Some(video.id));
        survey_active.is_video_uploaded = Set(true);
        survey_active.update(&txn).await?;

        let replaced = match previous {
            Some(old_id) => retire_video(&txn, old_id, self.removal_mode).await?,
            None => None,
        };

        txn.commit().await?;
        Ok((video.id, replaced))
    }

    /// Maps the asset to its video. Returns `false` when the video row was
    /// deleted by a later upload in the meantime.
    async fn record_asset(&self, video_id: Uuid, asset_id: &str) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        if video::Entity::find_by_id(video_id).one(&txn).await?.is_none() {
            txn.commit().await?;
            return Ok(false);
        }

        asset::ActiveModel {
            id: Set(Uuid::new_v4()),
            asset_id: Set(asset_id.to_string()),
            video_id: Set(video_id),
            created_at: Set(chrono::Utc::now().naive_utc()),
        }
        .insert(&txn)
        .await?;

        video::ActiveModel {
            id: Set(video_id),
            mux_asset_id: Set(Some(asset_id.to_string())),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        txn.commit().await?;
        Ok(true)
    }
}
