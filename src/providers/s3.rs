//! S3-compatible store: objects are fetched through presigned GET URLs

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use blob_fetch::{BlobStore, BlobStream, StoreResult, UNKNOWN_LENGTH};
use futures_util::StreamExt;
use log::{debug, info};
use tokio_util::io::StreamReader;

use crate::config::S3Settings;

/// Lifetime of the presigned URL used for one download (1 hour)
const PRESIGNED_URL_EXPIRY: Duration = Duration::from_secs(3600);

pub struct S3Store {
    client: Client,
    http: reqwest::Client,
    bucket: String,
}

impl S3Store {
    /// Build the store from static credentials without touching the network
    pub fn new(config: &S3Settings) -> StoreResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            config.secret_access_key.expose(),
            None,
            None,
            "blob-extract",
        );

        let mut builder = S3ConfigBuilder::new()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = config.endpoint_url.as_deref().map(str::trim) {
            if !endpoint.is_empty() {
                builder = builder.endpoint_url(endpoint);
            }
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            http: reqwest::Client::builder().build()?,
            bucket: config.bucket.clone(),
        })
    }

    /// Build the store and check that the bucket is reachable
    pub async fn connect(config: &S3Settings) -> StoreResult<Self> {
        let store = Self::new(config)?;
        store
            .client
            .head_bucket()
            .bucket(&store.bucket)
            .send()
            .await?;
        info!("s3_connected: bucket={}", store.bucket);
        Ok(store)
    }

    async fn generate_presigned_url(&self, key: &str) -> StoreResult<String> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(PRESIGNED_URL_EXPIRY)
            .build()?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await?;

        Ok(presigned_request.uri().to_string())
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn open(&self, name: &str) -> StoreResult<BlobStream> {
        let presigned_url = self
            .generate_presigned_url(name)
            .await
            .map_err(|e| format!("Failed to generate presigned URL: {}", e))?;

        let response = self
            .http
            .get(&presigned_url)
            .send()
            .await
            .map_err(|e| format!("Download request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Download failed: {} - {}", status, text).into());
        }

        // Chunked responses carry no length; stream them rather than buffer
        let length = response.content_length().unwrap_or(UNKNOWN_LENGTH);
        debug!("s3_open: {} length={}", name, length);

        let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
        Ok(BlobStream::new(length, StreamReader::new(body)))
    }
}
