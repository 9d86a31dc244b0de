use std::time::Duration;

use crate::{
    descriptor::ObjectDescriptor, error::Error, repo::VideoRecord, store::Store,
};

/// Swap a record's stored `bucket,key` location for a signed URL valid for `ttl`
///
/// Records without an uploaded video are returned unchanged. The URL is signed fresh on every call.
#[tracing::instrument(skip(store, record), fields(id = %record.id))]
pub(crate) async fn resolve<S: Store>(
    store: &S,
    mut record: VideoRecord,
    ttl: Duration,
) -> Result<VideoRecord, Error> {
    let Some(location) = record.video_url.as_deref() else {
        return Ok(record);
    };

    let descriptor = location.parse::<ObjectDescriptor>().map_err(|e| {
        tracing::error!("Refusing to sign malformed location for {}: {e}", record.id);
        e
    })?;

    let url = store.signed_url(&descriptor, ttl).await?;
    record.video_url = Some(url.to_string());

    Ok(record)
}

pub(crate) async fn resolve_all<S: Store>(
    store: &S,
    records: Vec<VideoRecord>,
    ttl: Duration,
) -> Result<Vec<VideoRecord>, Error> {
    let mut resolved = Vec::with_capacity(records.len());

    for record in records {
        resolved.push(resolve(store, record, ttl).await?);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use crate::{error_code::ErrorKind, repo::VideoRecord, store::memory::MemoryStore};

    const HOUR: Duration = Duration::from_secs(3600);

    fn record(video_url: Option<&str>) -> VideoRecord {
        let mut record = VideoRecord::new(Uuid::new_v4(), "title".into(), String::new());
        record.video_url = video_url.map(String::from);
        record
    }

    #[tokio::test]
    async fn unset_location_is_a_passthrough() {
        let store = MemoryStore::new("tubely");
        let original = record(None);

        let resolved = super::resolve(&store, original.clone(), HOUR)
            .await
            .expect("Resolved");

        assert_eq!(resolved, original);
        assert_eq!(store.sign_calls(), 0);
    }

    #[tokio::test]
    async fn location_becomes_signed_url() {
        let store = MemoryStore::new("tubely");

        let resolved = super::resolve(&store, record(Some("tubely,wide/abc.mp4")), HOUR)
            .await
            .expect("Resolved");

        assert_eq!(
            resolved.video_url.as_deref(),
            Some("https://tubely.storage.test/wide/abc.mp4?expires=3600")
        );
        assert_eq!(store.sign_calls(), 1);
    }

    #[tokio::test]
    async fn every_read_signs_again() {
        let store = MemoryStore::new("tubely");
        let stored = record(Some("tubely,tall/abc.mp4"));

        super::resolve(&store, stored.clone(), HOUR).await.expect("Resolved");
        super::resolve(&store, stored, HOUR).await.expect("Resolved");

        assert_eq!(store.sign_calls(), 2);
    }

    #[tokio::test]
    async fn malformed_location_is_not_not_uploaded() {
        let store = MemoryStore::new("tubely");

        for location in ["", "no-separator", ",key", "bucket,"] {
            let error = super::resolve(&store, record(Some(location)), HOUR)
                .await
                .expect_err("Malformed");

            assert_eq!(error.kind(), ErrorKind::MalformedDescriptor, "{location:?}");
        }

        assert_eq!(store.sign_calls(), 0);
    }
}
