use std::time::Instant;

use actix_web::web::Bytes;
use futures_util::Stream;
use uuid::Uuid;

use crate::{
    classify::classify,
    descriptor::ObjectDescriptor,
    error::{Error, UploadError},
    key::{derive_key, video_extension, KeyError},
    normalize::normalize,
    repo::{ArcRepo, VideoRecord},
    stage::{stage, StagedFile},
    state::State,
    store::Store,
    tmp_file::TmpFile,
};

struct MetricsGuard {
    start: Instant,
    armed: bool,
}

impl MetricsGuard {
    fn guard() -> Self {
        metrics::counter!(crate::init_metrics::UPLOAD_START).increment(1);

        Self {
            start: Instant::now(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for MetricsGuard {
    fn drop(&mut self) {
        metrics::histogram!(crate::init_metrics::UPLOAD_DURATION, "completed" => (!self.armed).to_string())
            .record(self.start.elapsed().as_secs_f64());

        metrics::counter!(crate::init_metrics::UPLOAD_END, "completed" => (!self.armed).to_string())
            .increment(1);
    }
}

/// Fetch `video_id`, failing unless it exists and belongs to `owner`
#[tracing::instrument(skip(repo))]
pub(crate) async fn authorize(
    repo: &ArcRepo,
    owner: Uuid,
    video_id: Uuid,
) -> Result<VideoRecord, Error> {
    let record = repo
        .get(video_id)
        .await?
        .ok_or(UploadError::VideoNotFound)?;

    if record.owner_id != owner {
        tracing::info!("Rejected request from {owner} for video owned by {}", record.owner_id);
        return Err(UploadError::NotOwner.into());
    }

    Ok(record)
}

/// Run an uploaded video through the ingestion pipeline and record where it was stored
///
/// Ownership and content type are checked before anything touches the disk. Every local file
/// created along the way is removed before this returns, whatever the outcome.
#[tracing::instrument(name = "Ingest video", skip(state, stream))]
pub(crate) async fn ingest<S, St>(
    state: &State<S>,
    owner: Uuid,
    video_id: Uuid,
    content_type: mime::Mime,
    stream: St,
) -> Result<VideoRecord, Error>
where
    S: Store,
    St: Stream<Item = Result<Bytes, Error>>,
{
    let guard = MetricsGuard::guard();

    let mut record = authorize(&state.repo, owner, video_id).await?;

    if video_extension(&content_type).is_none() {
        return Err(KeyError::UnsupportedContentType(content_type).into());
    }

    let staged = stage(&state.tmp_dir, stream, state.config.media.max_file_bytes()).await?;
    tracing::debug!("Staged {} bytes for {video_id}", staged.len());

    let res = process_staged(state, &staged, &content_type).await;

    staged.cleanup().await;

    let descriptor = res?;

    record.video_url = Some(descriptor.to_string());

    let updated = match state.repo.update(record).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(Error::from(UploadError::VideoNotFound)),
        Err(e) => Err(Error::from(e)),
    };

    let record = match updated {
        Ok(record) => record,
        Err(e) => {
            if let Err(remove_error) = state.store.remove(&descriptor).await {
                tracing::warn!("Failed to remove orphaned object {descriptor}: {remove_error}");
            }

            return Err(e);
        }
    };

    guard.disarm();

    Ok(record)
}

#[tracing::instrument(skip_all)]
async fn process_staged<S: Store>(
    state: &State<S>,
    staged: &StagedFile,
    content_type: &mime::Mime,
) -> Result<ObjectDescriptor, Error> {
    let normalized = normalize(&*state.tools, staged.path())
        .await
        .map_err(UploadError::Normalize)?;

    let res = upload_normalized(state, &normalized, content_type).await;

    normalized.release().await;

    res
}

#[tracing::instrument(skip_all)]
async fn upload_normalized<S: Store>(
    state: &State<S>,
    normalized: &TmpFile,
    content_type: &mime::Mime,
) -> Result<ObjectDescriptor, Error> {
    let orientation = classify(&*state.tools, normalized).await?;

    let key = derive_key(orientation, content_type)?;
    let descriptor = ObjectDescriptor::new(state.store.bucket(), key);

    let mut file = tokio::fs::File::open(normalized).await?;

    state
        .store
        .save_async_read(&descriptor, &mut file, content_type)
        .await?;

    tracing::debug!("Stored {descriptor}");

    Ok(descriptor)
}
