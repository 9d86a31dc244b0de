mod auth;
mod classify;
mod config;
mod descriptor;
mod error;
mod error_code;
mod ffmpeg;
mod future;
mod ingest;
mod init_metrics;
mod init_tracing;
mod key;
mod normalize;
mod process;
mod repo;
mod resolve;
mod stage;
mod state;
mod store;
mod thumbnail;
mod tmp_file;

use actix_form_data::{Field, Form, FormData, Multipart, Value};
use actix_web::{
    http::header::{CacheControl, CacheDirective},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use futures_util::TryStreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{marker::PhantomData, sync::Arc, time::Duration};
use tracing::Instrument;
use tracing_actix_web::TracingLogger;
use uuid::Uuid;

use self::{
    auth::{Authenticated, Verifier},
    config::{Configuration, Operation},
    descriptor::ObjectDescriptor,
    error::{Error, UploadError},
    ffmpeg::FfMpeg,
    init_tracing::init_tracing,
    repo::{Repo, VideoRecord},
    resolve::{resolve, resolve_all},
    state::State,
    store::{object_store::ObjectStore, Store},
    thumbnail::{read_limited, thumbnail_extension, Thumbnail, ThumbnailStore, UnsupportedThumbnail},
    tmp_file::TmpDir,
};

pub use self::config::{configure_without_clap, TubelyConfiguration};

fn parse_video_id(s: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(s).map_err(|e| UploadError::InvalidVideoId(e).into())
}

fn form_context<S: Store + 'static>(
    req: &HttpRequest,
) -> Result<(web::Data<State<S>>, Uuid, Uuid), Error> {
    let state = req
        .app_data::<web::Data<State<S>>>()
        .ok_or(UploadError::MissingAppData("application state"))?
        .clone();

    let owner = req
        .app_data::<web::Data<Verifier>>()
        .ok_or(UploadError::MissingAppData("token verifier"))?
        .verify(req.headers())?;

    let video_id = parse_video_id(req.match_info().query("video_id"))?;

    Ok((state, owner, video_id))
}

struct VideoUpload<S: Store + 'static>(Value<VideoRecord>, PhantomData<S>);

impl<S: Store + 'static> FormData for VideoUpload<S> {
    type Item = VideoRecord;
    type Error = Error;

    fn form(req: &HttpRequest) -> Result<Form<Self::Item, Self::Error>, Self::Error> {
        // Credentials and the video id are checked before any of the body is read
        //
        // This form is expecting a single file field, 'video'
        let (state, owner, video_id) = form_context::<S>(req)?;

        let max_file_size = state.config.media.max_file_bytes();

        Ok(Form::new()
            .max_files(1)
            .max_file_size(max_file_size)
            .transform_error(transform_error)
            .field(
                "video",
                Field::file(move |filename, content_type, stream| {
                    let state = state.clone();

                    let span = tracing::info_span!("video-upload", ?filename, %video_id);

                    let stream = stream.map_err(Error::from);

                    Box::pin(
                        async move {
                            let Some(content_type) = content_type else {
                                return Err(UploadError::MissingContentType.into());
                            };

                            ingest::ingest(&state, owner, video_id, content_type, stream).await
                        }
                        .instrument(span),
                    )
                }),
            ))
    }

    fn extract(value: Value<Self::Item>) -> Result<Self, Self::Error> {
        Ok(VideoUpload(value, PhantomData))
    }
}

struct ThumbnailUpload<S: Store + 'static>(Value<VideoRecord>, PhantomData<S>);

impl<S: Store + 'static> FormData for ThumbnailUpload<S> {
    type Item = VideoRecord;
    type Error = Error;

    fn form(req: &HttpRequest) -> Result<Form<Self::Item, Self::Error>, Self::Error> {
        // This form is expecting a single file field, 'thumbnail'
        let (state, owner, video_id) = form_context::<S>(req)?;

        let max_file_size = state.config.media.max_thumbnail_bytes();

        Ok(Form::new()
            .max_files(1)
            .max_file_size(max_file_size)
            .transform_error(transform_error)
            .field(
                "thumbnail",
                Field::file(move |filename, content_type, stream| {
                    let state = state.clone();

                    let span = tracing::info_span!("thumbnail-upload", ?filename, %video_id);

                    let stream = stream.map_err(Error::from);

                    Box::pin(
                        async move {
                            let mut record =
                                ingest::authorize(&state.repo, owner, video_id).await?;

                            let Some(content_type) = content_type else {
                                return Err(UploadError::MissingContentType.into());
                            };

                            if thumbnail_extension(&content_type).is_none() {
                                return Err(UnsupportedThumbnail(content_type).into());
                            }

                            let bytes =
                                read_limited(stream, state.config.media.max_thumbnail_bytes())
                                    .await?;

                            state.thumbnails.insert(
                                video_id,
                                Thumbnail {
                                    media_type: content_type,
                                    bytes,
                                },
                            );

                            record.thumbnail_url = Some(format!("/api/thumbnails/{video_id}"));

                            let record = state
                                .repo
                                .update(record)
                                .await?
                                .ok_or(UploadError::VideoNotFound)?;

                            Ok(record)
                        }
                        .instrument(span),
                    )
                }),
            ))
    }

    fn extract(value: Value<Self::Item>) -> Result<Self, Self::Error> {
        Ok(ThumbnailUpload(value, PhantomData))
    }
}

fn uploaded_record(value: Value<VideoRecord>, field: &str) -> Result<VideoRecord, Error> {
    let file = value
        .map()
        .and_then(|mut m| m.remove(field))
        .and_then(|v| v.file())
        .ok_or(UploadError::NoFiles)?;

    Ok(file.result)
}

fn signature_duration<S>(state: &State<S>) -> Duration {
    state.config.store.signature_duration()
}

/// Handle responding to successful video uploads
#[tracing::instrument(name = "Uploaded video", skip(value, state))]
async fn upload_video<S: Store + 'static>(
    Multipart(VideoUpload(value, _)): Multipart<VideoUpload<S>>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let record = uploaded_record(value, "video")?;

    tracing::info!("Stored video {}", record.id);

    let record = resolve(&state.store, record, signature_duration(&state)).await?;

    Ok(HttpResponse::Ok().json(&record))
}

#[tracing::instrument(name = "Uploaded thumbnail", skip(value, state))]
async fn upload_thumbnail<S: Store + 'static>(
    Multipart(ThumbnailUpload(value, _)): Multipart<ThumbnailUpload<S>>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let record = uploaded_record(value, "thumbnail")?;

    let record = resolve(&state.store, record, signature_duration(&state)).await?;

    Ok(HttpResponse::Ok().json(&record))
}

#[derive(Debug, serde::Deserialize)]
struct NewVideo {
    title: String,

    #[serde(default)]
    description: String,
}

#[tracing::instrument(name = "Creating video", skip(state, new_video))]
async fn create_video<S: Store + 'static>(
    Authenticated(owner): Authenticated,
    web::Json(new_video): web::Json<NewVideo>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let record = VideoRecord::new(owner, new_video.title, new_video.description);

    state.repo.create(&record).await?;

    Ok(HttpResponse::Created().json(&record))
}

#[tracing::instrument(name = "Listing videos", skip(state))]
async fn list_videos<S: Store + 'static>(
    Authenticated(owner): Authenticated,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let records = state.repo.list_by_owner(owner).await?;

    let records = resolve_all(&state.store, records, signature_duration(&state)).await?;

    Ok(HttpResponse::Ok().json(&records))
}

#[tracing::instrument(name = "Fetching video", skip(state))]
async fn get_video<S: Store + 'static>(
    Authenticated(owner): Authenticated,
    video_id: web::Path<String>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let video_id = parse_video_id(&video_id)?;

    let record = ingest::authorize(&state.repo, owner, video_id).await?;

    let record = resolve(&state.store, record, signature_duration(&state)).await?;

    Ok(HttpResponse::Ok().json(&record))
}

#[tracing::instrument(name = "Deleting video", skip(state))]
async fn delete_video<S: Store + 'static>(
    Authenticated(owner): Authenticated,
    video_id: web::Path<String>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let video_id = parse_video_id(&video_id)?;

    ingest::authorize(&state.repo, owner, video_id).await?;

    let Some(record) = state.repo.delete(video_id).await? else {
        return Err(UploadError::VideoNotFound.into());
    };

    state.thumbnails.remove(video_id);

    if let Some(location) = record.video_url.as_deref() {
        match location.parse::<ObjectDescriptor>() {
            Ok(descriptor) => {
                if let Err(e) = state.store.remove(&descriptor).await {
                    tracing::warn!("Failed to remove stored video {descriptor}: {e}");
                }
            }
            Err(e) => tracing::warn!("Not removing stored video for {video_id}: {e}"),
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "Serving thumbnail", skip(state))]
async fn serve_thumbnail<S: Store + 'static>(
    video_id: web::Path<String>,
    state: web::Data<State<S>>,
) -> Result<HttpResponse, Error> {
    let video_id = parse_video_id(&video_id)?;

    let thumbnail = state
        .thumbnails
        .get(video_id)
        .ok_or(UploadError::ThumbnailNotFound)?;

    Ok(HttpResponse::Ok()
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .content_type(thumbnail.media_type.to_string())
        .body(thumbnail.bytes))
}

async fn healthz<S: Store>(state: web::Data<State<S>>) -> Result<HttpResponse, Error> {
    state.repo.health_check().await?;
    state.store.health_check().await?;
    Ok(HttpResponse::Ok().finish())
}

fn transform_error(error: actix_form_data::Error) -> actix_web::Error {
    let error: Error = error.into();
    let error: actix_web::Error = error.into();
    error
}

fn configure_endpoints<S: Store + 'static>(
    config: &mut web::ServiceConfig,
    state: State<S>,
    verifier: Verifier,
) {
    config
        .app_data(web::Data::new(state))
        .app_data(web::Data::new(verifier))
        .route("/healthz", web::get().to(healthz::<S>))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/videos")
                        .route(web::post().to(create_video::<S>))
                        .route(web::get().to(list_videos::<S>)),
                )
                .service(
                    web::resource("/videos/{video_id}")
                        .route(web::get().to(get_video::<S>))
                        .route(web::delete().to(delete_video::<S>)),
                )
                .service(
                    web::resource("/videos/{video_id}/upload")
                        .route(web::post().to(upload_video::<S>)),
                )
                .service(
                    web::resource("/video_upload/{video_id}")
                        .route(web::post().to(upload_video::<S>)),
                )
                .service(
                    web::resource("/thumbnail_upload/{video_id}")
                        .route(web::post().to(upload_thumbnail::<S>)),
                )
                .service(
                    web::resource("/thumbnails/{video_id}")
                        .route(web::get().to(serve_thumbnail::<S>)),
                ),
        );
}

async fn launch<S: Store + Send + 'static>(
    state: State<S>,
    verifier: Verifier,
) -> std::io::Result<()> {
    let address = state.config.server.address;

    tracing::info!("Starting tubely on {address}");

    HttpServer::new(move || {
        let state = state.clone();
        let verifier = verifier.clone();

        App::new()
            .wrap(TracingLogger::default())
            .configure(move |sc| configure_endpoints(sc, state, verifier))
    })
    .bind(address)?
    .run()
    .await
}

fn build_verifier(config: &Configuration) -> color_eyre::Result<Verifier> {
    let secret = config
        .server
        .jwt_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| {
            color_eyre::eyre::eyre!(
                "server.jwt_secret must be set, for example with TUBELY__SERVER__JWT_SECRET"
            )
        })?;

    Ok(Verifier::new(secret, &config.server.jwt_issuer))
}

impl TubelyConfiguration {
    /// Build the tubely configuration from commandline arguments
    ///
    /// This is probably not useful for 3rd party applications that handle their own commandline
    pub fn build_default() -> color_eyre::Result<Self> {
        config::configure()
    }

    /// Install the default tubely tracer
    ///
    /// This is probably not useful for 3rd party applications that install their own tracing
    /// subscribers.
    pub fn install_tracing(self) -> color_eyre::Result<Self> {
        init_tracing(&self.config.tracing)?;
        Ok(self)
    }

    pub fn install_metrics(self) -> color_eyre::Result<Self> {
        if let Some(addr) = self.config.metrics.prometheus_address {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()?;

            tracing::info!("Starting prometheus endpoint on {addr}");
        }

        init_metrics::init_metrics();

        Ok(self)
    }

    /// Run the tubely application
    pub async fn run(self) -> color_eyre::Result<()> {
        let TubelyConfiguration { config, operation } = self;

        let verifier = build_verifier(&config)?;

        match operation {
            Operation::Run => (),
            Operation::Token { owner, ttl } => {
                let token = verifier.issue(owner, Duration::from_secs(ttl))?;
                println!("{token}");

                return Ok(());
            }
        }

        let tmp_dir = TmpDir::init(&config.server.temporary_directory).await?;

        let repo = Repo::open(config.repo.clone())?;
        let store = ObjectStore::build(&config.store)?;

        let state = State {
            tools: Arc::new(FfMpeg::new(&config.media)),
            config,
            tmp_dir: tmp_dir.clone(),
            repo: repo.to_arc(),
            store,
            thumbnails: ThumbnailStore::new(),
        };

        launch(state, verifier).await?;

        tmp_dir.cleanup().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc, time::Duration};

    use actix_web::{
        http::{header, StatusCode},
        test, App,
    };
    use uuid::Uuid;

    use crate::{
        auth::Verifier,
        ffmpeg::MediaTools,
        process::ProcessError,
        repo::{sled::SledRepo, ArcRepo, VideoRecord},
        state::State,
        store::memory::MemoryStore,
        thumbnail::ThumbnailStore,
        tmp_file::TmpDir,
    };

    const SECRET: &str = "test secret";
    const ISSUER: &str = "tubely-access";
    const BOUNDARY: &str = "tubely-test-boundary";

    struct Widescreen;

    #[async_trait::async_trait(?Send)]
    impl MediaTools for Widescreen {
        async fn remux_faststart(&self, input: &Path, output: &Path) -> Result<(), ProcessError> {
            tokio::fs::copy(input, output)
                .await
                .map(|_| ())
                .map_err(ProcessError::Other)
        }

        async fn probe_streams(&self, _: &Path) -> Result<Vec<u8>, ProcessError> {
            Ok(br#"{"streams":[{"width":1920,"height":1080}]}"#.to_vec())
        }
    }

    async fn state(store: MemoryStore) -> State<MemoryStore> {
        state_with(store, serde_json::json!({})).await
    }

    async fn state_with(store: MemoryStore, overrides: serde_json::Value) -> State<MemoryStore> {
        let config = crate::config::configure_without_clap::<&str, _, &str>(None, overrides, None)
        .expect("Built configuration")
        .config;

        let db = ::sled::Config::new()
            .temporary(true)
            .open()
            .expect("Opened db");
        let repo: ArcRepo = Arc::new(SledRepo::new(db).expect("Opened repo"));

        State {
            config,
            tmp_dir: TmpDir::init(std::env::temp_dir()).await.expect("Created tmp dir"),
            repo,
            store,
            tools: Arc::new(Widescreen),
            thumbnails: ThumbnailStore::new(),
        }
    }

    fn bearer(owner: Uuid) -> (header::HeaderName, String) {
        let token = crate::auth::make_jwt(owner, SECRET, ISSUER, Duration::from_secs(60))
            .expect("Signed token");

        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    fn multipart(field: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn untyped_multipart(field: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_type() -> (header::HeaderName, String) {
        (
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
    }

    async fn existing_video(state: &State<MemoryStore>, owner: Uuid) -> Uuid {
        let record = VideoRecord::new(owner, "title".into(), "description".into());
        state.repo.create(&record).await.expect("Created record");
        record.id
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().configure(|sc| {
                super::configure_endpoints(sc, $state, Verifier::new(SECRET, ISSUER))
            }))
            .await
        };
    }

    #[actix_web::test]
    async fn upload_returns_signed_url() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;
        let tmp_path = state.tmp_dir.path().to_path_buf();

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/mp4", b"not really a video"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        let video_url = body["video_url"].as_str().expect("Resolved url");
        assert!(
            video_url.starts_with("https://tubely.storage.test/wide/"),
            "{video_url}"
        );
        assert!(video_url.ends_with(".mp4?expires=3600"), "{video_url}");

        assert_eq!(store.objects().len(), 1);
        assert_eq!(std::fs::read_dir(tmp_path).expect("Read tmp dir").count(), 0);
    }

    #[actix_web::test]
    async fn upload_without_content_type_is_bad_request() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;
        let tmp_path = state.tmp_dir.path().to_path_buf();

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(untyped_multipart("video", b"bytes"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "missing-content-type");
        assert_eq!(body["kind"], "validation-error");
        assert!(store.objects().is_empty());
        assert_eq!(std::fs::read_dir(tmp_path).expect("Read tmp dir").count(), 0);
    }

    #[actix_web::test]
    async fn thumbnail_without_content_type_is_bad_request() {
        let state = state(MemoryStore::new("tubely")).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;
        let thumbnails = state.thumbnails.clone();

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/thumbnail_upload/{video_id}"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(untyped_multipart("thumbnail", b"image"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(thumbnails.get(video_id).is_none());
    }

    #[actix_web::test]
    async fn oversized_upload_is_payload_too_large() {
        let store = MemoryStore::new("tubely");
        let state = state_with(
            store.clone(),
            serde_json::json!({ "media": { "max_file_size": 1 } }),
        )
        .await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;
        let tmp_path = state.tmp_dir.path().to_path_buf();

        let app = app!(state);

        let video = vec![0u8; 1024 * 1024 + 4096];

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/mp4", &video))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "file-too-large");
        assert_eq!(body["kind"], "payload-too-large");
        assert!(store.objects().is_empty());
        assert_eq!(std::fs::read_dir(tmp_path).expect("Read tmp dir").count(), 0);
    }

    #[actix_web::test]
    async fn legacy_upload_route_is_kept() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/video_upload/{video_id}"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/mp4", b"bytes"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(store.objects().len(), 1);
    }

    #[actix_web::test]
    async fn upload_without_token_is_unauthorized() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let video_id = existing_video(&state, Uuid::new_v4()).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/mp4", b"bytes"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "missing-credentials");
        assert_eq!(body["kind"], "validation-error");
        assert!(store.objects().is_empty());
    }

    #[actix_web::test]
    async fn upload_by_another_owner_is_unauthorized() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let video_id = existing_video(&state, Uuid::new_v4()).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(bearer(Uuid::new_v4()))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/mp4", b"bytes"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "not-owner");
        assert!(store.objects().is_empty());
    }

    #[actix_web::test]
    async fn upload_with_wrong_type_is_bad_request() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/videos/{video_id}/upload"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("video", "video/webm", b"bytes"))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(store.objects().is_empty());
    }

    #[actix_web::test]
    async fn invalid_video_ids_are_bad_requests() {
        let state = state(MemoryStore::new("tubely")).await;
        let owner = Uuid::new_v4();

        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/videos/not-a-uuid")
            .insert_header(bearer(owner))
            .to_request();

        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "invalid-video-id");
    }

    #[actix_web::test]
    async fn videos_are_created_listed_and_deleted() {
        let store = MemoryStore::new("tubely");
        let state = state(store.clone()).await;
        let owner = Uuid::new_v4();

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/videos")
            .insert_header(bearer(owner))
            .set_json(serde_json::json!({ "title": "Boots", "description": "A video" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let created: serde_json::Value = test::read_body_json(res).await;
        let video_id = created["id"].as_str().expect("Video id").to_string();
        assert!(created["video_url"].is_null());

        let req = test::TestRequest::get()
            .uri("/api/videos")
            .insert_header(bearer(owner))
            .to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(store.sign_calls(), 0);

        let req = test::TestRequest::get()
            .uri(&format!("/api/videos/{video_id}"))
            .insert_header(bearer(Uuid::new_v4()))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/videos/{video_id}"))
            .insert_header(bearer(owner))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/videos/{video_id}"))
            .insert_header(bearer(owner))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn thumbnails_are_served_uncached() {
        let state = state(MemoryStore::new("tubely")).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/thumbnail_upload/{video_id}"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("thumbnail", "image/png", b"png bytes"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        let thumbnail_url = format!("/api/thumbnails/{video_id}");
        assert_eq!(body["thumbnail_url"], thumbnail_url.as_str());

        let req = test::TestRequest::get().uri(&thumbnail_url).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"image/png"[..])
        );

        let bytes = test::read_body(res).await;
        assert_eq!(&bytes[..], b"png bytes");
    }

    #[actix_web::test]
    async fn gif_thumbnails_are_rejected() {
        let state = state(MemoryStore::new("tubely")).await;
        let owner = Uuid::new_v4();
        let video_id = existing_video(&state, owner).await;

        let app = app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/thumbnail_upload/{video_id}"))
            .insert_header(bearer(owner))
            .insert_header(multipart_type())
            .set_payload(multipart("thumbnail", "image/gif", b"gif bytes"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/api/thumbnails/{video_id}"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn healthz_checks_repo_and_store() {
        let state = state(MemoryStore::new("tubely")).await;

        let app = app!(state);

        let req = test::TestRequest::get().uri("/healthz").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
