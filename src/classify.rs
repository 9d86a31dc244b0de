
use std::path::Path;

use crate::{error_code::ErrorCode, ffmpeg::MediaTools, process::ProcessError};

/// Coarse bucketing of a video's display shape
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Orientation {
    /// Roughly 16:9
    Wide,
    /// Roughly 9:16
    Tall,
    Other,
}

impl Orientation {
    pub(crate) const fn prefix(self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Tall => "tall",
            Self::Other => "other",
        }
    }

    pub(crate) fn from_ratio(ratio: f64) -> Self {
        if 1.70 < ratio && ratio < 1.85 {
            Self::Wide
        } else if 0.52 < ratio && ratio < 0.60 {
            Self::Tall
        } else {
            Self::Other
        }
    }

    fn from_dimensions(width: u32, height: u32) -> Self {
        Self::from_ratio(f64::from(width) / f64::from(height))
    }
}

#[derive(Debug, serde::Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, serde::Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ClassifyError {
    #[error("Error in ffprobe process")]
    Process(#[from] ProcessError),

    #[error("Error parsing ffprobe output")]
    Json(#[from] serde_json::Error),

    #[error("Video contains no streams")]
    NoStreams,
}

impl ClassifyError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Process(e) => e.error_code(),
            Self::Json(_) => ErrorCode::PROBE_PARSE_ERROR,
            Self::NoStreams => ErrorCode::NO_STREAMS,
        }
    }
}

/// Probe `path` and bucket its first stream by aspect ratio
#[tracing::instrument(skip(tools))]
pub(crate) async fn classify(
    tools: &dyn MediaTools,
    path: &Path,
) -> Result<Orientation, ClassifyError> {
    let output = tools.probe_streams(path).await?;

    let orientation = parse_orientation(&output)?;
    tracing::debug!("Classified as {}", orientation.prefix());

    Ok(orientation)
}

fn parse_orientation(output: &[u8]) -> Result<Orientation, ClassifyError> {
    let output: ProbeOutput = serde_json::from_slice(output)?;

    let Some(first) = output.streams.first() else {
        return Err(ClassifyError::NoStreams);
    };

    Ok(Orientation::from_dimensions(first.width, first.height))
}
