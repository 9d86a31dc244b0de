use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::descriptor::ObjectDescriptor;

use super::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    sign_calls: usize,
    fail_puts: bool,
}

/// A recording store for exercising handlers without object storage
#[derive(Clone, Debug)]
pub(crate) struct MemoryStore {
    bucket: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub(crate) fn new(bucket: &str) -> Self {
        MemoryStore {
            bucket: Arc::from(bucket),
            inner: Arc::default(),
        }
    }

    pub(crate) fn failing_puts(self) -> Self {
        self.inner.lock().expect("Not poisoned").fail_puts = true;
        self
    }

    pub(crate) fn objects(&self) -> BTreeMap<String, StoredObject> {
        self.inner.lock().expect("Not poisoned").objects.clone()
    }

    pub(crate) fn sign_calls(&self) -> usize {
        self.inner.lock().expect("Not poisoned").sign_calls
    }
}

#[async_trait::async_trait(?Send)]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn save_async_read<Reader>(
        &self,
        descriptor: &ObjectDescriptor,
        reader: &mut Reader,
        content_type: &mime::Mime,
    ) -> Result<(), StoreError>
    where
        Reader: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let mut inner = self.inner.lock().expect("Not poisoned");

        if inner.fail_puts {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "store unavailable",
            )));
        }

        inner.objects.insert(
            descriptor.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );

        Ok(())
    }

    async fn signed_url(
        &self,
        descriptor: &ObjectDescriptor,
        ttl: Duration,
    ) -> Result<Url, StoreError> {
        self.inner.lock().expect("Not poisoned").sign_calls += 1;

        let url = Url::parse(&format!(
            "https://{}.storage.test/{}?expires={}",
            descriptor.bucket(),
            descriptor.key(),
            ttl.as_secs()
        ))
        .expect("Valid url");

        Ok(url)
    }

    async fn remove(&self, descriptor: &ObjectDescriptor) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Not poisoned")
            .objects
            .remove(&descriptor.to_string());

        Ok(())
    }
}
