use std::{ffi::OsStr, path::Path, time::Duration};

use crate::process::{self, ProcessError};

/// The external media capabilities the ingestion pipeline depends on
#[async_trait::async_trait(?Send)]
pub(crate) trait MediaTools: Send + Sync {
    /// Copy every stream of `input` into `output` with the index moved to the front of the file
    async fn remux_faststart(&self, input: &Path, output: &Path) -> Result<(), ProcessError>;

    /// Describe the streams contained in `path` as ffprobe-style JSON
    async fn probe_streams(&self, path: &Path) -> Result<Vec<u8>, ProcessError>;
}

#[derive(Clone, Debug)]
pub(crate) struct FfMpeg {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl FfMpeg {
    pub(crate) fn new(media: &crate::config::Media) -> Self {
        FfMpeg {
            ffmpeg_path: media.ffmpeg_path.clone(),
            ffprobe_path: media.ffprobe_path.clone(),
            timeout: media.process_timeout(),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl MediaTools for FfMpeg {
    #[tracing::instrument(skip(self))]
    async fn remux_faststart(&self, input: &Path, output: &Path) -> Result<(), ProcessError> {
        let args: [&OsStr; 12] = [
            "-hide_banner".as_ref(),
            "-v".as_ref(),
            "error".as_ref(),
            "-i".as_ref(),
            input.as_os_str(),
            "-c".as_ref(),
            "copy".as_ref(),
            "-movflags".as_ref(),
            "faststart".as_ref(),
            "-f".as_ref(),
            "mp4".as_ref(),
            output.as_os_str(),
        ];

        process::run(&self.ffmpeg_path, &args, self.timeout).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn probe_streams(&self, path: &Path) -> Result<Vec<u8>, ProcessError> {
        let args: [&OsStr; 6] = [
            "-v".as_ref(),
            "error".as_ref(),
            "-print_format".as_ref(),
            "json".as_ref(),
            "-show_streams".as_ref(),
            path.as_os_str(),
        ];

        process::run(&self.ffprobe_path, &args, self.timeout).await
    }
}
