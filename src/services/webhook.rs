//! Mux webhook parsing, signature checks and dispatch.

use hmac::{Hmac, Mac};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{asset, video};
use crate::services::mux::Transcoder;

type HmacSha256 = Hmac<Sha256>;

/// Event types that mean the asset finished processing and is playable.
const COMPLETE_EVENTS: &[&str] = &["video.upload.ready", "video.asset.ready"];
const FAILED_EVENT: &str = "video.asset.errored";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("completion event carries no asset id")]
    MissingAssetId,
    #[error("completion event for asset {0} carries no playback id")]
    MissingPlaybackId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header malformed")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Debug, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub object: Option<IdRef>,
    #[serde(default)]
    pub playback_ids: Option<Vec<IdRef>>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ProcessingComplete,
    ProcessingFailed,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    PlaybackUpdated { video_id: Uuid, playback_url: String },
    UnknownAsset(String),
    FailureAcknowledged,
    Ignored,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        if COMPLETE_EVENTS.contains(&self.event_type.as_str()) {
            EventKind::ProcessingComplete
        } else if self.event_type == FAILED_EVENT {
            EventKind::ProcessingFailed
        } else {
            EventKind::Other
        }
    }

    /// `object.id`, or `data.id` for events that only carry the asset body.
    pub fn asset_id(&self) -> Option<&str> {
        self.object
            .as_ref()
            .map(|o| o.id.as_str())
            .or_else(|| self.data.as_ref()?.get("id")?.as_str())
    }

    pub fn playback_id(&self) -> Option<&str> {
        self.playback_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .map(|p| p.id.as_str())
            .or_else(|| {
                self.data
                    .as_ref()?
                    .get("playback_ids")?
                    .get(0)?
                    .get("id")?
                    .as_str()
            })
    }
}

pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    Ok(serde_json::from_slice(body)?)
}

pub async fn handle_event<C>(
    db: &C,
    transcoder: &dyn Transcoder,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, WebhookError>
where
    C: ConnectionTrait,
{
    match event.kind() {
        EventKind::ProcessingComplete => {
            let asset_id = event.asset_id().ok_or(WebhookError::MissingAssetId)?;

            let Some(mapping) = asset::Entity::find()
                .filter(asset::Column::AssetId.eq(asset_id))
                .one(db)
                .await?
            else {
                tracing::warn!(asset = %asset_id, "Webhook | no video mapped to asset, skipping");
                return Ok(WebhookOutcome::UnknownAsset(asset_id.to_string()));
            };

            let playback_id = event
                .playback_id()
                .ok_or_else(|| WebhookError::MissingPlaybackId(asset_id.to_string()))?;
            let playback_url = transcoder.playback_url(playback_id);

            let result = video::Entity::update_many()
                .col_expr(video::Column::MuxPlaybackId, Expr::value(playback_url.clone()))
                .filter(video::Column::Id.eq(mapping.video_id))
                .exec(db)
                .await?;

            if result.rows_affected == 0 {
                tracing::warn!(asset = %asset_id, video = %mapping.video_id, "Webhook | mapped video no longer exists");
            }

            Ok(WebhookOutcome::PlaybackUpdated {
                video_id: mapping.video_id,
                playback_url,
            })
        }
        EventKind::ProcessingFailed => {
            tracing::warn!(asset = ?event.asset_id(), "Webhook | asset processing failed");
            Ok(WebhookOutcome::FailureAcknowledged)
        }
        EventKind::Other => {
            tracing::info!(event = %event.event_type, "Webhook | unhandled event");
            Ok(WebhookOutcome::Ignored)
        }
    }
}

/// Checks a `mux-signature` header (`t=<unix>,v1=<hex>`) against the raw body.
pub fn verify_signature(
    header: Option<&str>,
    body: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now.abs_diff(timestamp) > tolerance_secs.max(0).unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
