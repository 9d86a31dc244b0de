use std::io::SeekFrom;

use actix_web::web::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt},
};

use crate::{
    error_code::ErrorCode,
    tmp_file::{TmpDir, TmpFile},
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StageError {
    #[error("Upload exceeded the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Error writing upload to the staging directory")]
    Io(#[from] std::io::Error),
}

impl StageError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::TooLarge { .. } => ErrorCode::FILE_TOO_LARGE,
            Self::Io(_) => ErrorCode::FILE_IO_ERROR,
        }
    }
}

/// An upload written to local disk, positioned at its first byte
///
/// The caller owns removal: [`StagedFile::cleanup`] closes the handle before deleting the file,
/// and dropping the value removes the file as a last resort.
#[derive(Debug)]
pub(crate) struct StagedFile {
    file: File,
    path: TmpFile,
    len: u64,
}

impl StagedFile {
    pub(crate) fn path(&self) -> &TmpFile {
        &self.path
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) async fn cleanup(self) {
        let StagedFile { file, path, .. } = self;

        drop(file);
        path.release().await;
    }
}

/// Write `stream` into a fresh file under `tmp_dir`, failing once more than `max_bytes` arrive
///
/// Nothing is left on disk when this returns an error.
#[tracing::instrument(skip(tmp_dir, stream))]
pub(crate) async fn stage<S, E>(
    tmp_dir: &TmpDir,
    stream: S,
    max_bytes: usize,
) -> Result<StagedFile, E>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: From<StageError>,
{
    let path = tmp_dir.tmp_file(Some(".upload"));

    let file = match create_private(&path).await {
        Ok(file) => file,
        Err(e) => {
            path.release().await;
            return Err(StageError::Io(e).into());
        }
    };

    match write_bounded(file, stream, max_bytes).await {
        Ok((file, len)) => {
            metrics::histogram!(crate::init_metrics::STAGE_BYTES).record(len as f64);

            Ok(StagedFile { file, path, len })
        }
        Err(e) => {
            path.release().await;
            Err(e)
        }
    }
}

async fn create_private(path: &TmpFile) -> std::io::Result<File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.read(true).write(true).create_new(true);

    #[cfg(unix)]
    options.mode(0o600);

    options.open(path).await
}

async fn write_bounded<S, E>(mut file: File, stream: S, max_bytes: usize) -> Result<(File, u64), E>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: From<StageError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut written: usize = 0;

    while let Some(bytes) = stream.next().await {
        let bytes = bytes?;

        written = written.saturating_add(bytes.len());
        if written > max_bytes {
            return Err(StageError::TooLarge { limit: max_bytes }.into());
        }

        file.write_all(&bytes).await.map_err(StageError::from)?;
    }

    file.flush().await.map_err(StageError::from)?;
    file.sync_all().await.map_err(StageError::from)?;
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(StageError::from)?;

    Ok((file, written as u64))
}
