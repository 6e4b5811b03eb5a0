//! Mux video API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("request to transcoding service failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcoding service returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Creates a processing asset from a publicly readable input URL and
    /// returns the asset id. Playback readiness arrives later by webhook.
    async fn create_asset(&self, input_url: &str) -> Result<String, TranscodeError>;

    /// Finalized playback URL for a playback id.
    fn playback_url(&self, playback_id: &str) -> String;
}

#[derive(Serialize)]
struct CreateAssetRequest<'a> {
    inputs: Vec<AssetInput<'a>>,
    playback_policies: [&'static str; 1],
}

#[derive(Serialize)]
struct AssetInput<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Asset {
    id: String,
}

#[derive(Clone)]
pub struct MuxClient {
    http: reqwest::Client,
    api_base: String,
    stream_base: String,
    token_id: String,
    token_secret: String,
}

impl MuxClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.mux_api_base.clone(),
            stream_base: config.mux_stream_base.clone(),
            token_id: config.mux_token_id.clone(),
            token_secret: config.mux_token_secret.clone(),
        }
    }
}

#[async_trait]
impl Transcoder for MuxClient {
    async fn create_asset(&self, input_url: &str) -> Result<String, TranscodeError> {
        let body = CreateAssetRequest {
            inputs: vec![AssetInput { url: input_url }],
            playback_policies: ["public"],
        };

        let response = self
            .http
            .post(format!("{}/video/v1/assets", self.api_base))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscodeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let asset: Envelope<Asset> = response.json().await?;
        tracing::debug!(asset_id = %asset.data.id, "Mux asset created");
        Ok(asset.data.id)
    }

    fn playback_url(&self, playback_id: &str) -> String {
        format!("{}/{}.m3u8", self.stream_base, playback_id)
    }
}
