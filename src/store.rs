use std::{fmt::Debug, time::Duration};

use tokio::io::AsyncRead;
use url::Url;

use crate::{descriptor::ObjectDescriptor, error_code::ErrorCode};

#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod object_store;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("Error in object store")]
    ObjectStore(#[from] crate::store::object_store::ObjectError),

    #[error("Error reading upload for storage")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ObjectStore(e) => e.error_code(),
            Self::Io(_) => ErrorCode::FILE_IO_ERROR,
        }
    }
}

/// Durable, key-addressed storage for normalized videos
#[async_trait::async_trait(?Send)]
pub(crate) trait Store: Clone + Debug {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// The bucket new uploads are written to
    fn bucket(&self) -> &str;

    async fn save_async_read<Reader>(
        &self,
        descriptor: &ObjectDescriptor,
        reader: &mut Reader,
        content_type: &mime::Mime,
    ) -> Result<(), StoreError>
    where
        Reader: AsyncRead + Unpin;

    /// A URL granting read access to the object until `ttl` elapses
    async fn signed_url(
        &self,
        descriptor: &ObjectDescriptor,
        ttl: Duration,
    ) -> Result<Url, StoreError>;

    async fn remove(&self, descriptor: &ObjectDescriptor) -> Result<(), StoreError>;
}
