use std::sync::Arc;

use actix_web::web::{Bytes, BytesMut};
use dashmap::DashMap;
use futures_util::{Stream, StreamExt};
use uuid::Uuid;

use crate::{error_code::ErrorCode, stage::StageError};

#[derive(Clone, Debug)]
pub(crate) struct Thumbnail {
    pub(crate) media_type: mime::Mime,
    pub(crate) bytes: Bytes,
}

/// Thumbnails held in memory for the lifetime of the process, keyed by video id
#[derive(Clone, Debug, Default)]
pub(crate) struct ThumbnailStore {
    inner: Arc<DashMap<Uuid, Thumbnail>>,
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported thumbnail type {0}")]
pub(crate) struct UnsupportedThumbnail(pub(crate) mime::Mime);

impl UnsupportedThumbnail {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        ErrorCode::UNSUPPORTED_MEDIA_TYPE
    }
}

pub(crate) fn thumbnail_extension(media_type: &mime::Mime) -> Option<&'static str> {
    match media_type.essence_str() {
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        _ => None,
    }
}

impl ThumbnailStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace any thumbnail already stored for `video_id`
    pub(crate) fn insert(&self, video_id: Uuid, thumbnail: Thumbnail) {
        metrics::counter!(crate::init_metrics::THUMBNAIL_STORED).increment(1);

        self.inner.insert(video_id, thumbnail);
    }

    pub(crate) fn get(&self, video_id: Uuid) -> Option<Thumbnail> {
        self.inner.get(&video_id).map(|entry| entry.value().clone())
    }

    pub(crate) fn remove(&self, video_id: Uuid) -> Option<Thumbnail> {
        self.inner.remove(&video_id).map(|(_, thumbnail)| thumbnail)
    }
}

/// Collect a stream into memory, failing once it grows past `max_bytes`
pub(crate) async fn read_limited<S, E>(stream: S, max_bytes: usize) -> Result<Bytes, E>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: From<StageError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buf = BytesMut::new();

    while let Some(bytes) = stream.next().await {
        let bytes = bytes?;

        if buf.len().saturating_add(bytes.len()) > max_bytes {
            return Err(StageError::TooLarge { limit: max_bytes }.into());
        }

        buf.extend_from_slice(&bytes);
    }

    Ok(buf.freeze())
}
