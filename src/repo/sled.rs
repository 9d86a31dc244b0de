use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Db, Transactional, Tree,
};
use uuid::Uuid;

use crate::{error_code::ErrorCode, future::WithMetrics};

use super::{RepoError, VideoRecord, VideoRepo};

macro_rules! b {
    ($self:ident.$ident:ident, $expr:expr) => {{
        let $ident = $self.$ident.clone();

        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| $expr))
            .with_metrics(crate::init_metrics::SLED_OPERATION)
            .await
            .map_err(SledError::from)
            .map_err(RepoError::from)?
            .map_err(SledError::from)
            .map_err(RepoError::from)?
    }};
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SledError {
    #[error("Error in database")]
    Sled(#[from] sled::Error),

    #[error("Invalid video record json")]
    Record(#[from] serde_json::Error),

    #[error("Malformed owner index key")]
    IndexKey,

    #[error("Transaction was aborted")]
    Aborted,

    #[error("Operation panicked")]
    Panic,
}

impl SledError {
    pub(super) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Sled(_) | Self::Aborted => ErrorCode::SLED_ERROR,
            Self::Record(_) | Self::IndexKey => ErrorCode::REPO_FORMAT_ERROR,
            Self::Panic => ErrorCode::PANIC,
        }
    }
}

impl From<tokio::task::JoinError> for SledError {
    fn from(_: tokio::task::JoinError) -> Self {
        SledError::Panic
    }
}

impl From<TransactionError<()>> for SledError {
    fn from(value: TransactionError<()>) -> Self {
        match value {
            TransactionError::Abort(()) => SledError::Aborted,
            TransactionError::Storage(e) => SledError::Sled(e),
        }
    }
}

#[derive(Clone)]
pub(crate) struct SledRepo {
    healthz_count: Arc<AtomicU64>,
    healthz: Tree,
    videos: Tree,
    owner_videos: Tree,
    _db: Db,
}

impl std::fmt::Debug for SledRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRepo").finish()
    }
}

impl SledRepo {
    pub(crate) fn new(db: Db) -> Result<Self, SledError> {
        Ok(SledRepo {
            healthz_count: Arc::new(AtomicU64::new(0)),
            healthz: db.open_tree("tubely-healthz-tree")?,
            videos: db.open_tree("tubely-videos-tree")?,
            owner_videos: db.open_tree("tubely-owner-videos-tree")?,
            _db: db,
        })
    }
}

fn owner_key(owner_id: Uuid, id: Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn id_from_owner_key(key: &[u8]) -> Result<Uuid, SledError> {
    let id = key.get(16..).ok_or(SledError::IndexKey)?;

    Uuid::from_slice(id).map_err(|_| SledError::IndexKey)
}

fn insert_record(
    videos: &Tree,
    owner_videos: &Tree,
    record: &VideoRecord,
) -> Result<(), SledError> {
    let value = serde_json::to_vec(record)?;
    let owner_key = owner_key(record.owner_id, record.id);

    (videos, owner_videos).transaction(|(videos, owner_videos)| {
        videos.insert(record.id.as_bytes(), value.as_slice())?;
        owner_videos.insert(owner_key.as_slice(), record.id.as_bytes())?;

        Ok::<_, ConflictableTransactionError<()>>(())
    })?;

    Ok(())
}

#[async_trait::async_trait(?Send)]
impl VideoRepo for SledRepo {
    #[tracing::instrument(level = "trace", skip(self))]
    async fn health_check(&self) -> Result<(), RepoError> {
        let next = self.healthz_count.fetch_add(1, Ordering::Relaxed);

        b!(self.healthz, {
            healthz.insert("healthz", &next.to_be_bytes()[..])
        });

        self.healthz.flush_async().await.map_err(SledError::from)?;

        b!(self.healthz, healthz.get("healthz"));

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, record), fields(id = %record.id))]
    async fn create(&self, record: &VideoRecord) -> Result<(), RepoError> {
        let videos = self.videos.clone();
        let owner_videos = self.owner_videos.clone();
        let record = record.clone();

        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            span.in_scope(|| insert_record(&videos, &owner_videos, &record))
        })
        .with_metrics(crate::init_metrics::SLED_OPERATION)
        .await
        .map_err(SledError::from)??;

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError> {
        let opt = b!(self.videos, videos.get(id.as_bytes()));

        let Some(ivec) = opt else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&ivec).map_err(SledError::from)?;

        Ok(Some(record))
    }

    #[tracing::instrument(level = "debug", skip(self, record), fields(id = %record.id))]
    async fn update(&self, mut record: VideoRecord) -> Result<Option<VideoRecord>, RepoError> {
        record.updated_at = time::OffsetDateTime::now_utc();

        let value = serde_json::to_vec(&record).map_err(SledError::from)?;
        let owner_key = owner_key(record.owner_id, record.id);
        let id = record.id;

        let videos = self.videos.clone();
        let owner_videos = self.owner_videos.clone();

        let span = tracing::Span::current();

        let updated = tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                (&videos, &owner_videos).transaction(|(videos, owner_videos)| {
                    if videos.get(id.as_bytes())?.is_none()
                        || owner_videos.get(owner_key.as_slice())?.is_none()
                    {
                        return Ok(false);
                    }

                    videos.insert(id.as_bytes(), value.as_slice())?;

                    Ok::<_, ConflictableTransactionError<()>>(true)
                })
            })
        })
        .with_metrics(crate::init_metrics::SLED_OPERATION)
        .await
        .map_err(SledError::from)?
        .map_err(SledError::from)?;

        if !updated {
            tracing::debug!("Video {id} was removed before it could be updated");
            return Ok(None);
        }

        Ok(Some(record))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<VideoRecord>, RepoError> {
        let videos = self.videos.clone();
        let owner_videos = self.owner_videos.clone();

        let span = tracing::Span::current();

        let mut records = tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                let mut records = Vec::new();

                for res in owner_videos.scan_prefix(owner_id.as_bytes()) {
                    let (key, _) = res?;
                    let id = id_from_owner_key(&key)?;

                    if let Some(ivec) = videos.get(id.as_bytes())? {
                        records.push(serde_json::from_slice::<VideoRecord>(&ivec)?);
                    }
                }

                Ok(records) as Result<Vec<VideoRecord>, SledError>
            })
        })
        .with_metrics(crate::init_metrics::SLED_OPERATION)
        .await
        .map_err(SledError::from)??;

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(records)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };

        let videos = self.videos.clone();
        let owner_videos = self.owner_videos.clone();
        let owner_key = owner_key(record.owner_id, record.id);

        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                (&videos, &owner_videos).transaction(|(videos, owner_videos)| {
                    videos.remove(id.as_bytes())?;
                    owner_videos.remove(owner_key.as_slice())?;

                    Ok::<_, ConflictableTransactionError<()>>(())
                })
            })
        })
        .with_metrics(crate::init_metrics::SLED_OPERATION)
        .await
        .map_err(SledError::from)?
        .map_err(SledError::from)?;

        Ok(Some(record))
    }
}
