//! GridFS store backed by the MongoDB driver

use std::time::Duration;

use async_trait::async_trait;
use blob_fetch::{BlobStore, BlobStream, StoreResult};
use log::{debug, info};
use mongodb::bson::doc;
use mongodb::gridfs::GridFsBucket;
use mongodb::options::{ClientOptions, Credential, GridFsBucketOptions, ReadPreference};
use mongodb::Client;
use tokio_util::compat::FuturesAsyncReadCompatExt;

use crate::config::GridFsSettings;

pub struct GridFsStore {
    client: Client,
    bucket: GridFsBucket,
}

impl GridFsStore {
    /// Connect, authenticate and ping the deployment.
    ///
    /// `timeout` bounds socket connection and server selection; callers bound
    /// the whole call separately.
    pub async fn connect(config: &GridFsSettings, timeout: Duration) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;

        if let Some(username) = &config.username {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(config.password.as_ref().map(|p| p.expose().to_string()))
                    .build(),
            );
        }

        // Bulk reads go to secondaries to keep load off the primary
        options.selection_criteria = Some(
            ReadPreference::Secondary {
                options: Default::default(),
            }
            .into(),
        );
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        database.run_command(doc! { "ping": 1 }).await?;

        let bucket = database.gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(config.bucket.clone())
                .build(),
        );
        info!(
            "gridfs_connected: database={} bucket={}",
            config.database, config.bucket
        );

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl BlobStore for GridFsStore {
    async fn open(&self, name: &str) -> StoreResult<BlobStream> {
        // Newest revision wins, matching the driver's download-by-name default
        let file = self
            .bucket
            .find_one(doc! { "filename": name })
            .sort(doc! { "uploadDate": -1 })
            .await?
            .ok_or_else(|| format!("file with name {} not found", name))?;

        let length = file.length;
        let stream = self.bucket.open_download_stream(file.id).await?;
        debug!("gridfs_open: {} length={}", name, length);

        Ok(BlobStream::new(length, stream.compat()))
    }

    async fn disconnect(&self) -> StoreResult<()> {
        // The store itself still holds the bucket handle, so do not wait for it
        self.client.clone().shutdown().immediate(true).await;
        info!("gridfs_disconnected");
        Ok(())
    }
}
