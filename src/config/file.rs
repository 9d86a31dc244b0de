use crate::config::primitives::{LogFormat, Targets};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

const MEGABYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct ConfigFile {
    pub(crate) server: Server,

    pub(crate) tracing: Tracing,

    #[serde(default)]
    pub(crate) metrics: Metrics,

    pub(crate) media: Media,

    pub(crate) repo: Repo,

    pub(crate) store: Store,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Server {
    pub(crate) address: SocketAddr,

    pub(crate) temporary_directory: PathBuf,

    /// Shared secret for HS256 access tokens, read from the environment or a config file
    #[serde(default, skip_serializing)]
    pub(crate) jwt_secret: Option<String>,

    pub(crate) jwt_issuer: String,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Tracing {
    pub(crate) logging: Logging,

    pub(crate) opentelemetry: OpenTelemetry,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Logging {
    pub(crate) format: LogFormat,

    pub(crate) targets: Targets,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct OpenTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<Url>,

    pub(crate) service_name: String,

    pub(crate) targets: Targets,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) prometheus_address: Option<SocketAddr>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Media {
    /// Upload ceiling for videos, in megabytes
    pub(crate) max_file_size: usize,

    /// Upload ceiling for thumbnails, in megabytes
    pub(crate) max_thumbnail_size: usize,

    /// Seconds an external media tool may run before it is killed
    pub(crate) process_timeout: u64,

    pub(crate) ffmpeg_path: String,

    pub(crate) ffprobe_path: String,
}

impl Media {
    pub(crate) fn max_file_bytes(&self) -> usize {
        self.max_file_size.saturating_mul(MEGABYTES)
    }

    pub(crate) fn max_thumbnail_bytes(&self) -> usize {
        self.max_thumbnail_size.saturating_mul(MEGABYTES)
    }

    pub(crate) fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub(crate) enum Repo {
    Sled(Sled),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Sled {
    pub(crate) path: PathBuf,

    pub(crate) cache_capacity: u64,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Store {
    /// The bucket new uploads are written to
    pub(crate) bucket: String,

    pub(crate) region: String,

    /// Base endpoint for S3-compatible services, such as `http://localhost:9000` for minio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) endpoint: Option<Url>,

    /// Address objects as {endpoint}/{bucket}/{key} rather than {bucket}.{endpoint}/{key}
    pub(crate) use_path_style: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) access_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) secret_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session_token: Option<String>,

    /// How long signed playback URLs stay valid, in seconds
    pub(crate) signature_duration: u64,
}

impl Store {
    pub(crate) fn signature_duration(&self) -> Duration {
        Duration::from_secs(self.signature_duration)
    }
}
