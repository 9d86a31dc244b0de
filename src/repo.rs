use std::{fmt::Debug, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{config, error_code::ErrorCode};

pub(crate) mod sled;

pub(crate) type ArcRepo = Arc<dyn VideoRepo>;

#[derive(Clone, Debug)]
pub(crate) enum Repo {
    Sled(self::sled::SledRepo),
}

/// A video owned by a single user, along with where its uploaded bytes live
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub(crate) struct VideoRecord {
    pub(crate) id: Uuid,
    pub(crate) owner_id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) thumbnail_url: Option<String>,
    /// `bucket,key` once a video has been uploaded, or a signed URL in responses
    pub(crate) video_url: Option<String>,
}

impl VideoRecord {
    pub(crate) fn new(owner_id: Uuid, title: String, description: String) -> Self {
        let now = OffsetDateTime::now_utc();

        VideoRecord {
            id: Uuid::new_v4(),
            owner_id,
            title,
            description,
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RepoError {
    #[error("Error in sled")]
    SledError(#[from] crate::repo::sled::SledError),
}

impl RepoError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SledError(e) => e.error_code(),
        }
    }
}

/// Storage for video metadata
///
/// Writes are last-writer-wins; concurrent uploads for one video are not coordinated.
#[async_trait::async_trait(?Send)]
pub(crate) trait VideoRepo: Debug + Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;

    async fn create(&self, record: &VideoRecord) -> Result<(), RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError>;

    /// Persist `record`, stamping its `updated_at`
    ///
    /// Returns `None` without writing anything if the record has been deleted.
    async fn update(&self, record: VideoRecord) -> Result<Option<VideoRecord>, RepoError>;

    /// Every video owned by `owner_id`, newest first
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<VideoRecord>, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError>;
}

impl Repo {
    #[tracing::instrument]
    pub(crate) fn open(config: config::Repo) -> color_eyre::Result<Self> {
        match config {
            config::Repo::Sled(config::Sled {
                mut path,
                cache_capacity,
            }) => {
                path.push("v0.1.0");

                let db = ::sled::Config::new()
                    .cache_capacity(cache_capacity)
                    .path(path)
                    .open()?;

                Ok(Self::Sled(self::sled::SledRepo::new(db)?))
            }
        }
    }

    pub(crate) fn to_arc(&self) -> ArcRepo {
        match self {
            Self::Sled(sled_repo) => Arc::new(sled_repo.clone()),
        }
    }
}
