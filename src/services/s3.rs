use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::config::Config;
use crate::services::storage::{join_public_url, ObjectStore, StorageError};

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    pub bucket_name: String,
    public_base: String,
}

impl S3Service {
    pub async fn new(config: &Config) -> Self {
        let region = aws_sdk_s3::config::Region::new(config.aws_region.clone());

        let mut s3_config_builder = match (&config.aws_access_key_id, &config.aws_secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "manual_config",
                );
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
            }
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket_name: config.s3_bucket_name.clone(),
            public_base: public_base(config),
        }
    }
}

fn public_base(config: &Config) -> String {
    if let Some(base) = &config.public_base_url {
        base.clone()
    } else if let Some(endpoint) = &config.s3_endpoint {
        format!("{}/{}", endpoint, config.s3_bucket_name)
    } else {
        format!("https://{}.s3.{}.amazonaws.com", config.s3_bucket_name, config.aws_region)
    }
}

#[async_trait]
impl ObjectStore for S3Service {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 Upload Error: {:?}", e);
                StorageError::Upload {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 Delete Error: {}", e);
                StorageError::Delete {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(&self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&'static str, &'static str)]) -> Config {
        Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .or_else(|| match name {
                    "DATABASE_URL" => Some("sqlite::memory:".into()),
                    "S3_BUCKET_NAME" => Some("test".into()),
                    "MUX_TOKEN_ID" | "MUX_TOKEN_SECRET" => Some("x".into()),
                    _ => None,
                })
        })
        .unwrap()
    }

    #[test]
    fn public_base_prefers_explicit_base_url() {
        let c = config(&[
            ("PUBLIC_BASE_URL", "https://proj.supabase.co/storage/v1/object/public/test/"),
            ("S3_ENDPOINT", "http://minio:9000"),
        ]);
        assert_eq!(public_base(&c), "https://proj.supabase.co/storage/v1/object/public/test");
    }

    #[test]
    fn public_base_uses_path_style_for_custom_endpoints() {
        let c = config(&[("S3_ENDPOINT", "http://minio:9000")]);
        assert_eq!(public_base(&c), "http://minio:9000/test");
    }

    #[test]
    fn public_base_defaults_to_virtual_host_style() {
        let c = config(&[("AWS_REGION", "eu-west-1")]);
        assert_eq!(public_base(&c), "https://test.s3.eu-west-1.amazonaws.com");
    }
}
