use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json};
use serde::Serialize;

use crate::error::AppError;
use crate::services::webhook::{self, WebhookError, WebhookOutcome};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "mux-signature";

#[derive(Serialize, utoipa::ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        tracing::error!("Webhook | POST /api/mux/webhook | res=500 | {}", err);
        AppError::Upstream("Webhook handling failed".to_string())
    }
}

#[utoipa::path(
    post,
    path = "/api/mux/webhook",
    tag = "Webhooks",
    request_body(content = String, content_type = "application/json", description = "Mux event with `type` and payload"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 401, description = "Invalid webhook signature"),
        (status = 500, description = "Webhook handling failed")
    )
)]
pub async fn mux_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(secret) = state.config.mux_webhook_secret.as_deref() {
        let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        let now = chrono::Utc::now().timestamp();
        if let Err(e) = webhook::verify_signature(
            header,
            &body,
            secret,
            state.config.mux_webhook_tolerance_secs,
            now,
        ) {
            tracing::warn!("Webhook | POST /api/mux/webhook | res=401 | {}", e);
            return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
        }
    }

    let event = webhook::parse_event(&body)?;
    let outcome = webhook::handle_event(&state.db, state.transcoder.as_ref(), &event).await?;

    match &outcome {
        WebhookOutcome::PlaybackUpdated { video_id, .. } => {
            tracing::info!("Webhook | POST /api/mux/webhook | type={} | video={} | res=200", event.event_type, video_id);
        }
        WebhookOutcome::UnknownAsset(asset_id) => {
            tracing::info!("Webhook | POST /api/mux/webhook | type={} | asset={} unmapped | res=200", event.event_type, asset_id);
        }
        WebhookOutcome::FailureAcknowledged | WebhookOutcome::Ignored => {
            tracing::info!("Webhook | POST /api/mux/webhook | type={} | res=200", event.event_type);
        }
    }

    Ok(Json(WebhookAck { received: true }))
}
