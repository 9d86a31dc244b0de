use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use color_eyre::Report;

use crate::error_code::{ErrorCode, ErrorKind};

pub(crate) struct Error {
    inner: color_eyre::Report,
}

impl Error {
    pub(crate) fn upload_error(&self) -> Option<&UploadError> {
        self.inner.downcast_ref()
    }

    pub(crate) fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        self.inner.root_cause()
    }

    pub(crate) fn error_code(&self) -> ErrorCode {
        self.upload_error()
            .map(|e| e.error_code())
            .unwrap_or(ErrorCode::UNKNOWN_ERROR)
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.upload_error()
            .map(|e| e.kind())
            .unwrap_or(ErrorKind::Internal)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl<T> From<T> for Error
where
    UploadError: From<T>,
{
    fn from(error: T) -> Self {
        Error {
            inner: Report::from(UploadError::from(error)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum UploadError {
    #[error("Couldn't parse upload")]
    Upload(#[from] actix_form_data::Error),

    #[error("Couldn't stage upload")]
    Stage(#[from] crate::stage::StageError),

    #[error("Couldn't prepare video for streaming")]
    Normalize(#[source] crate::process::ProcessError),

    #[error("Couldn't determine video orientation")]
    Classify(#[from] crate::classify::ClassifyError),

    #[error("Couldn't derive storage key")]
    Key(#[from] crate::key::KeyError),

    #[error("Error in store")]
    Store(#[from] crate::store::StoreError),

    #[error("Stored video location is corrupt")]
    Descriptor(#[from] crate::descriptor::DescriptorError),

    #[error("Error in DB")]
    Repo(#[from] crate::repo::RepoError),

    #[error("Couldn't authenticate request")]
    Auth(#[from] crate::auth::AuthError),

    #[error("Invalid thumbnail")]
    Thumbnail(#[from] crate::thumbnail::UnsupportedThumbnail),

    #[error("Error interacting with filesystem")]
    Io(#[from] std::io::Error),

    #[error("Invalid video id")]
    InvalidVideoId(#[source] uuid::Error),

    #[error("Video not found")]
    VideoNotFound,

    #[error("Thumbnail not found")]
    ThumbnailNotFound,

    #[error("Video is owned by another user")]
    NotOwner,

    #[error("No files present in upload")]
    NoFiles,

    #[error("Uploaded file has no content type")]
    MissingContentType,

    #[error("Request is missing {0}")]
    MissingAppData(&'static str),
}

impl UploadError {
    const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Upload(actix_form_data::Error::FileSize) => ErrorCode::FILE_TOO_LARGE,
            Self::Upload(_) => ErrorCode::FILE_UPLOAD_ERROR,
            Self::Stage(e) => e.error_code(),
            Self::Normalize(e) => e.error_code(),
            Self::Classify(e) => e.error_code(),
            Self::Key(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Descriptor(e) => e.error_code(),
            Self::Repo(e) => e.error_code(),
            Self::Auth(e) => e.error_code(),
            Self::Thumbnail(e) => e.error_code(),
            Self::Io(_) => ErrorCode::FILE_IO_ERROR,
            Self::InvalidVideoId(_) => ErrorCode::INVALID_VIDEO_ID,
            Self::VideoNotFound => ErrorCode::VIDEO_NOT_FOUND,
            Self::ThumbnailNotFound => ErrorCode::THUMBNAIL_NOT_FOUND,
            Self::NotOwner => ErrorCode::NOT_OWNER,
            Self::NoFiles => ErrorCode::NO_FILES,
            Self::MissingContentType => ErrorCode::MISSING_CONTENT_TYPE,
            Self::MissingAppData(_) => ErrorCode::UNKNOWN_ERROR,
        }
    }

    pub(crate) const fn kind(&self) -> ErrorKind {
        match self {
            Self::Upload(actix_form_data::Error::FileSize)
            | Self::Stage(crate::stage::StageError::TooLarge { .. }) => ErrorKind::PayloadTooLarge,
            Self::Auth(crate::auth::AuthError::Sign(_)) => ErrorKind::Internal,
            Self::Upload(_)
            | Self::Key(_)
            | Self::Auth(_)
            | Self::Thumbnail(_)
            | Self::InvalidVideoId(_)
            | Self::NotOwner
            | Self::NoFiles
            | Self::MissingContentType => ErrorKind::ValidationError,
            Self::Stage(_) => ErrorKind::StagingFailure,
            Self::Normalize(_) => ErrorKind::NormalizationFailure,
            Self::Classify(_) => ErrorKind::ClassificationFailure,
            Self::Store(_) => ErrorKind::StoreFailure,
            Self::Descriptor(_) => ErrorKind::MalformedDescriptor,
            Self::VideoNotFound | Self::ThumbnailNotFound => ErrorKind::NotFound,
            Self::Repo(_) | Self::Io(_) | Self::MissingAppData(_) => ErrorKind::Internal,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.upload_error() {
            Some(UploadError::Auth(e)) if !matches!(e, crate::auth::AuthError::Sign(_)) => {
                StatusCode::UNAUTHORIZED
            }
            Some(UploadError::NotOwner) => StatusCode::UNAUTHORIZED,
            _ => match self.kind() {
                ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
                ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StagingFailure
                | ErrorKind::NormalizationFailure
                | ErrorKind::ClassificationFailure
                | ErrorKind::StoreFailure
                | ErrorKind::MalformedDescriptor
                | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::warn!("{}: {}", self.inner, self.root_cause());
        }

        HttpResponse::build(self.status_code())
            .content_type("application/json")
            .body(
                serde_json::to_string(&serde_json::json!({
                    "msg": self.inner.to_string(),
                    "code": self.error_code(),
                    "kind": self.kind(),
                }))
                .unwrap_or_else(|_| {
                    r#"{"msg":"Request failed","code":"unknown-error","kind":"internal"}"#
                        .to_string()
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, ResponseError};
    use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

    use super::{Error, UploadError};
    use crate::{
        auth::AuthError,
        error_code::ErrorKind,
        process::ProcessError,
        stage::StageError,
    };

    #[test]
    fn statuses_follow_kinds() {
        let cases: Vec<(Error, StatusCode, ErrorKind)> = vec![
            (
                StageError::TooLarge { limit: 1 }.into(),
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::PayloadTooLarge,
            ),
            (
                UploadError::NotOwner.into(),
                StatusCode::UNAUTHORIZED,
                ErrorKind::ValidationError,
            ),
            (
                crate::auth::AuthError::Unauthenticated.into(),
                StatusCode::UNAUTHORIZED,
                ErrorKind::ValidationError,
            ),
            (
                UploadError::VideoNotFound.into(),
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound,
            ),
            (
                UploadError::NoFiles.into(),
                StatusCode::BAD_REQUEST,
                ErrorKind::ValidationError,
            ),
            (
                UploadError::MissingContentType.into(),
                StatusCode::BAD_REQUEST,
                ErrorKind::ValidationError,
            ),
            (
                AuthError::Sign(JwtErrorKind::InvalidKeyFormat.into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal,
            ),
            (
                UploadError::Normalize(ProcessError::Timeout(String::from("ffmpeg"))).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::NormalizationFailure,
            ),
            (
                StageError::Io(std::io::ErrorKind::Other.into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::StagingFailure,
            ),
        ];

        for (error, status, kind) in cases {
            assert_eq!(error.status_code(), status, "{error}");
            assert_eq!(error.kind(), kind, "{error}");
        }
    }

    #[test]
    fn body_hides_diagnostics() {
        let error: Error = UploadError::Normalize(ProcessError::Status {
            command: String::from("ffmpeg"),
            code: Some(1),
            stderr: String::from("unsupported codec"),
        })
        .into();

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(error.to_string(), "Couldn't prepare video for streaming");
        assert!(error.root_cause().to_string().contains("unsupported codec"));
        assert_eq!(error.error_code().as_str(), "command-failure");
    }
}
