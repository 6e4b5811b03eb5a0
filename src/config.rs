use std::env;
use std::str::FromStr;

use chrono::FixedOffset;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// What removing a survey's video does to the video row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRemovalMode {
    /// Delete the video row (and its asset mappings) and the stored object.
    Delete,
    /// Only unlink the video from the survey.
    Detach,
}

impl FromStr for VideoRemovalMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(VideoRemovalMode::Delete),
            "detach" => Ok(VideoRemovalMode::Detach),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub s3_bucket_name: String,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub mux_token_id: String,
    pub mux_token_secret: String,
    pub mux_api_base: String,
    pub mux_stream_base: String,
    pub mux_webhook_secret: Option<String>,
    pub mux_webhook_tolerance_secs: i64,
    pub upload_concurrency: usize,
    pub max_upload_bytes: usize,
    pub video_removal_mode: VideoRemovalMode,
    pub display_offset: FixedOffset,
    pub login_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let upload_concurrency: usize = parse_var(&lookup, "UPLOAD_CONCURRENCY", 3)?;
        let offset_minutes: i32 = parse_var(&lookup, "DISPLAY_UTC_OFFSET_MINUTES", 0)?;
        let display_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or(ConfigError::Invalid {
            name: "DISPLAY_UTC_OFFSET_MINUTES",
            value: offset_minutes.to_string(),
        })?;

        let video_removal_mode = match lookup("VIDEO_REMOVAL_MODE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "VIDEO_REMOVAL_MODE",
                value: raw,
            })?,
            None => VideoRemovalMode::Delete,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000"),
            s3_bucket_name: required("S3_BUCKET_NAME")?,
            aws_region: or_default("AWS_REGION", "us-east-1"),
            aws_access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            s3_endpoint: lookup("S3_ENDPOINT").map(|e| e.trim_end_matches('/').to_string()),
            public_base_url: lookup("PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            mux_token_id: required("MUX_TOKEN_ID")?,
            mux_token_secret: required("MUX_TOKEN_SECRET")?,
            mux_api_base: or_default("MUX_API_BASE", "https://api.mux.com")
                .trim_end_matches('/')
                .to_string(),
            mux_stream_base: or_default("MUX_STREAM_BASE", "https://stream.mux.com")
                .trim_end_matches('/')
                .to_string(),
            mux_webhook_secret: lookup("MUX_WEBHOOK_SECRET"),
            mux_webhook_tolerance_secs: parse_var(&lookup, "MUX_WEBHOOK_TOLERANCE_SECS", 300)?,
            upload_concurrency: upload_concurrency.max(1),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 512 * 1024 * 1024)?,
            video_removal_mode,
            display_offset,
            login_url: or_default("LOGIN_URL", "/login"),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
