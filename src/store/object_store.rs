use std::{sync::Arc, time::Duration};

use ::object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    path::Path,
    signer::Signer,
    Attribute, Attributes, ObjectStore as _, PutMultipartOpts, WriteMultipart,
};
use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::{
    config::Store as StoreConfig, descriptor::ObjectDescriptor, error_code::ErrorCode,
    future::WithMetrics,
};

use super::{Store, StoreError};

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_CONCURRENT_PARTS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ObjectError {
    #[error("Failed to build object storage client")]
    Build(#[source] ::object_store::Error),

    #[error("Invalid object key")]
    Path(#[from] ::object_store::path::Error),

    #[error("Error making object storage request")]
    Request(#[source] ::object_store::Error),

    #[error("Error signing object storage URL")]
    Sign(#[source] ::object_store::Error),
}

impl ObjectError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Build(_) | Self::Path(_) | Self::Request(_) => ErrorCode::OBJECT_REQUEST_ERROR,
            Self::Sign(_) => ErrorCode::OBJECT_SIGN_ERROR,
        }
    }
}

/// S3-compatible storage
///
/// Records may point into buckets other than the one uploads go to, so clients are built per
/// bucket from a shared template and kept for the life of the process.
#[derive(Clone)]
pub(crate) struct ObjectStore {
    template: AmazonS3Builder,
    bucket: Arc<str>,
    clients: Arc<DashMap<String, Arc<AmazonS3>>>,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("bucket", &self.bucket)
            .field("clients", &self.clients.len())
            .finish()
    }
}

impl ObjectStore {
    pub(crate) fn build(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut template = AmazonS3Builder::new()
            .with_region(&config.region)
            .with_virtual_hosted_style_request(!config.use_path_style);

        if let Some(endpoint) = &config.endpoint {
            template = template
                .with_endpoint(endpoint.as_str().trim_end_matches('/'))
                .with_allow_http(endpoint.scheme() == "http");
        }

        if let Some(access_key) = &config.access_key {
            template = template.with_access_key_id(access_key);
        }

        if let Some(secret_key) = &config.secret_key {
            template = template.with_secret_access_key(secret_key);
        }

        if let Some(session_token) = &config.session_token {
            template = template.with_token(session_token);
        }

        let store = ObjectStore {
            template,
            bucket: Arc::from(config.bucket.as_str()),
            clients: Arc::new(DashMap::new()),
        };

        // surface credential and endpoint problems at startup
        store.client(&config.bucket)?;

        Ok(store)
    }

    fn client(&self, bucket: &str) -> Result<Arc<AmazonS3>, ObjectError> {
        if let Some(client) = self.clients.get(bucket) {
            return Ok(Arc::clone(&client));
        }

        let client = self
            .template
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(ObjectError::Build)?;

        let client = self
            .clients
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(client))
            .clone();

        Ok(client)
    }
}

fn object_path(descriptor: &ObjectDescriptor) -> Result<Path, ObjectError> {
    Ok(Path::parse(descriptor.key())?)
}

#[async_trait::async_trait(?Send)]
impl Store for ObjectStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let client = self.client(&self.bucket)?;

        client
            .list_with_delimiter(None)
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_HEAD_BUCKET_REQUEST)
            .await
            .map_err(ObjectError::Request)?;

        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[tracing::instrument(skip(self, reader))]
    async fn save_async_read<Reader>(
        &self,
        descriptor: &ObjectDescriptor,
        reader: &mut Reader,
        content_type: &mime::Mime,
    ) -> Result<(), StoreError>
    where
        Reader: AsyncRead + Unpin,
    {
        let client = self.client(descriptor.bucket())?;
        let path = object_path(descriptor)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let opts = PutMultipartOpts {
            attributes,
            ..Default::default()
        };

        let upload = client
            .put_multipart_opts(&path, opts)
            .await
            .map_err(ObjectError::Request)?;

        let mut upload = WriteMultipart::new(upload);

        let res = async {
            let mut buf = vec![0u8; CHUNK_SIZE];

            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }

                upload
                    .wait_for_capacity(MAX_CONCURRENT_PARTS)
                    .await
                    .map_err(ObjectError::Request)?;
                upload.write(&buf[..n]);
            }

            Ok(()) as Result<(), StoreError>
        }
        .await;

        if let Err(e) = res {
            if let Err(abort_error) = upload.abort().await {
                tracing::warn!("Failed to abort multipart upload: {abort_error}");
            }

            return Err(e);
        }

        upload
            .finish()
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_PUT_OBJECT_REQUEST)
            .await
            .map_err(ObjectError::Request)?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn signed_url(
        &self,
        descriptor: &ObjectDescriptor,
        ttl: Duration,
    ) -> Result<Url, StoreError> {
        let client = self.client(descriptor.bucket())?;
        let path = object_path(descriptor)?;

        let url = client
            .signed_url(reqwest::Method::GET, &path, ttl)
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_SIGN_REQUEST)
            .await
            .map_err(ObjectError::Sign)?;

        Ok(url)
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, descriptor: &ObjectDescriptor) -> Result<(), StoreError> {
        let client = self.client(descriptor.bucket())?;
        let path = object_path(descriptor)?;

        client
            .delete(&path)
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_DELETE_OBJECT_REQUEST)
            .await
            .map_err(ObjectError::Request)?;

        Ok(())
    }
}
