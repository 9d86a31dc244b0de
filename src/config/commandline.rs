use crate::config::primitives::{LogFormat, Targets};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use url::Url;
use uuid::Uuid;

const DAYS: u64 = 60 * 60 * 24;

impl Args {
    pub(super) fn into_output(self) -> Output {
        let Args {
            config_file,
            log_format,
            log_targets,
            opentelemetry_url,
            opentelemetry_service_name,
            opentelemetry_targets,
            save_to,
            command,
        } = self;

        let tracing = Tracing {
            logging: Logging {
                format: log_format,
                targets: log_targets,
            },
            opentelemetry: OpenTelemetry {
                url: opentelemetry_url,
                service_name: opentelemetry_service_name,
                targets: opentelemetry_targets,
            },
        };

        match command {
            Command::Run(Run {
                address,
                temporary_directory,
                jwt_secret,
                jwt_issuer,
                metrics_prometheus_address,
                media_max_file_size,
                media_max_thumbnail_size,
                media_process_timeout,
                media_ffmpeg_path,
                media_ffprobe_path,
                repo_path,
                repo_cache_capacity,
                store_bucket,
                store_region,
                store_endpoint,
                store_use_path_style,
                store_access_key,
                store_secret_key,
                store_session_token,
                store_signature_duration,
            }) => {
                let server = Server {
                    address,
                    temporary_directory,
                    jwt_secret,
                    jwt_issuer,
                };

                let metrics = Metrics {
                    prometheus_address: metrics_prometheus_address,
                };

                let media = Media {
                    max_file_size: media_max_file_size,
                    max_thumbnail_size: media_max_thumbnail_size,
                    process_timeout: media_process_timeout,
                    ffmpeg_path: media_ffmpeg_path,
                    ffprobe_path: media_ffprobe_path,
                };

                let repo = Sled {
                    path: repo_path,
                    cache_capacity: repo_cache_capacity,
                }
                .set()
                .map(Repo::Sled);

                let store = Store {
                    bucket: store_bucket,
                    region: store_region,
                    endpoint: store_endpoint,
                    use_path_style: store_use_path_style,
                    access_key: store_access_key,
                    secret_key: store_secret_key,
                    session_token: store_session_token,
                    signature_duration: store_signature_duration,
                };

                Output {
                    config_format: ConfigFormat {
                        server,
                        tracing,
                        metrics,
                        media,
                        repo,
                        store,
                    },
                    operation: Operation::Run,
                    config_file,
                    save_to,
                }
            }
            Command::Token(Token { owner, ttl }) => Output {
                config_format: ConfigFormat {
                    tracing,
                    ..Default::default()
                },
                operation: Operation::Token {
                    owner,
                    ttl: ttl.unwrap_or(DAYS),
                },
                config_file,
                save_to,
            },
        }
    }
}

pub(super) struct Output {
    pub(super) config_format: ConfigFormat,
    pub(super) operation: Operation,
    pub(super) save_to: Option<PathBuf>,
    pub(super) config_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub(crate) enum Operation {
    Run,
    Token { owner: Uuid, ttl: u64 },
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct ConfigFormat {
    server: Server,
    tracing: Tracing,
    metrics: Metrics,
    media: Media,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<Repo>,
    store: Store,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Server {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwt_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwt_issuer: Option<String>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Tracing {
    logging: Logging,
    opentelemetry: OpenTelemetry,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Logging {
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<LogFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Targets>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct OpenTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Targets>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    prometheus_address: Option<SocketAddr>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Media {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_file_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_thumbnail_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ffmpeg_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ffprobe_path: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
enum Repo {
    Sled(Sled),
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Sled {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_capacity: Option<u64>,
}

impl Sled {
    fn set(self) -> Option<Self> {
        let any_set = self.path.is_some() || self.cache_capacity.is_some();

        if any_set {
            Some(self)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Store {
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<Url>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_path_style: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_duration: Option<u64>,
}

/// Run the tubely video service
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(super) struct Args {
    /// Path to the tubely configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Format of logs printed to stdout
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Log levels to print to stdout, respects RUST_LOG formatting
    #[arg(long)]
    log_targets: Option<Targets>,

    /// URL to send OpenTelemetry traces
    #[arg(long)]
    opentelemetry_url: Option<Url>,
    /// Service Name to use for OpenTelemetry
    #[arg(long)]
    opentelemetry_service_name: Option<String>,
    /// Log levels to use for OpenTelemetry, respects RUST_LOG formatting
    #[arg(long)]
    opentelemetry_targets: Option<Targets>,

    /// File to save the current configuration for reproducible runs
    #[arg(long)]
    save_to: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the tubely web server
    Run(Run),

    /// Prints an access token for the given owner, for local development
    Token(Token),
}

#[derive(Debug, Parser)]
struct Run {
    /// The address and port to bind the tubely web server
    #[arg(short, long)]
    address: Option<SocketAddr>,

    /// The directory uploads are staged in while they are processed
    #[arg(long)]
    temporary_directory: Option<PathBuf>,

    /// The shared secret used to verify access tokens
    ///
    /// Prefer setting TUBELY__SERVER__JWT_SECRET over passing this on the commandline
    #[arg(long)]
    jwt_secret: Option<String>,

    /// The issuer access tokens must carry
    #[arg(long)]
    jwt_issuer: Option<String>,

    /// Whether to enable the prometheus scrape endpoint
    #[arg(long)]
    metrics_prometheus_address: Option<SocketAddr>,

    /// The maximum size, in megabytes, for uploaded videos
    #[arg(long)]
    media_max_file_size: Option<usize>,

    /// The maximum size, in megabytes, for uploaded thumbnails
    #[arg(long)]
    media_max_thumbnail_size: Option<usize>,

    /// Timeout, in seconds, for ffmpeg and ffprobe invocations
    #[arg(long)]
    media_process_timeout: Option<u64>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    media_ffmpeg_path: Option<String>,

    /// Path to the ffprobe binary
    #[arg(long)]
    media_ffprobe_path: Option<String>,

    /// The path to store the sled database
    #[arg(long)]
    repo_path: Option<PathBuf>,

    /// The cache capacity, in bytes, allowed to sled for in-memory operations
    #[arg(long)]
    repo_cache_capacity: Option<u64>,

    /// The bucket in which to store uploaded videos
    #[arg(long)]
    store_bucket: Option<String>,

    /// The region the bucket is located in
    ///
    /// For minio deployments, this can just be 'minio'
    #[arg(long)]
    store_region: Option<String>,

    /// The base endpoint for the object storage
    ///
    /// Examples:
    /// - `http://localhost:9000`
    /// - `https://s3.dualstack.eu-west-1.amazonaws.com`
    #[arg(long)]
    store_endpoint: Option<Url>,

    /// Determines whether to use path style or virtualhost style for accessing objects
    #[arg(long)]
    store_use_path_style: bool,

    /// The Access Key for the user accessing the bucket
    #[arg(long)]
    store_access_key: Option<String>,

    /// The secret key for the user accessing the bucket
    #[arg(long)]
    store_secret_key: Option<String>,

    /// The session token for accessing the bucket
    #[arg(long)]
    store_session_token: Option<String>,

    /// How long signed playback URLs are valid (in seconds)
    ///
    /// This defaults to 3600 seconds
    #[arg(long)]
    store_signature_duration: Option<u64>,
}

#[derive(Debug, Parser)]
struct Token {
    /// The owner id to issue the token for
    #[arg(long)]
    owner: Uuid,

    /// How long the token is valid (in seconds)
    ///
    /// This defaults to one day
    #[arg(long)]
    ttl: Option<u64>,
}
