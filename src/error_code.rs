#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub(crate) struct ErrorCode {
    code: &'static str,
}

impl ErrorCode {
    pub(crate) const fn as_str(&self) -> &'static str {
        self.code
    }

    pub(crate) const COMMAND_TIMEOUT: ErrorCode = ErrorCode {
        code: "command-timeout",
    };
    pub(crate) const COMMAND_ERROR: ErrorCode = ErrorCode {
        code: "command-error",
    };
    pub(crate) const COMMAND_FAILURE: ErrorCode = ErrorCode {
        code: "command-failure",
    };
    pub(crate) const COMMAND_NOT_FOUND: ErrorCode = ErrorCode {
        code: "command-not-found",
    };
    pub(crate) const COMMAND_PERMISSION_DENIED: ErrorCode = ErrorCode {
        code: "command-permission-denied",
    };
    pub(crate) const FILE_UPLOAD_ERROR: ErrorCode = ErrorCode {
        code: "file-upload-error",
    };
    pub(crate) const FILE_TOO_LARGE: ErrorCode = ErrorCode {
        code: "file-too-large",
    };
    pub(crate) const NO_FILES: ErrorCode = ErrorCode { code: "no-files" };
    pub(crate) const MISSING_CONTENT_TYPE: ErrorCode = ErrorCode {
        code: "missing-content-type",
    };
    pub(crate) const UNSUPPORTED_MEDIA_TYPE: ErrorCode = ErrorCode {
        code: "unsupported-media-type",
    };
    pub(crate) const INVALID_VIDEO_ID: ErrorCode = ErrorCode {
        code: "invalid-video-id",
    };
    pub(crate) const MISSING_CREDENTIALS: ErrorCode = ErrorCode {
        code: "missing-credentials",
    };
    pub(crate) const INVALID_CREDENTIALS: ErrorCode = ErrorCode {
        code: "invalid-credentials",
    };
    pub(crate) const NOT_OWNER: ErrorCode = ErrorCode { code: "not-owner" };
    pub(crate) const VIDEO_NOT_FOUND: ErrorCode = ErrorCode {
        code: "video-not-found",
    };
    pub(crate) const THUMBNAIL_NOT_FOUND: ErrorCode = ErrorCode {
        code: "thumbnail-not-found",
    };
    pub(crate) const FILE_IO_ERROR: ErrorCode = ErrorCode {
        code: "file-io-error",
    };
    pub(crate) const PROBE_PARSE_ERROR: ErrorCode = ErrorCode {
        code: "probe-parse-error",
    };
    pub(crate) const NO_STREAMS: ErrorCode = ErrorCode { code: "no-streams" };
    pub(crate) const UNSUPPORTED_EXTENSION: ErrorCode = ErrorCode {
        code: "unsupported-extension",
    };
    pub(crate) const OBJECT_REQUEST_ERROR: ErrorCode = ErrorCode {
        code: "object-request-error",
    };
    pub(crate) const OBJECT_SIGN_ERROR: ErrorCode = ErrorCode {
        code: "object-sign-error",
    };
    pub(crate) const MALFORMED_DESCRIPTOR: ErrorCode = ErrorCode {
        code: "malformed-descriptor",
    };
    pub(crate) const SLED_ERROR: ErrorCode = ErrorCode { code: "sled-error" };
    pub(crate) const REPO_FORMAT_ERROR: ErrorCode = ErrorCode {
        code: "repo-format-error",
    };
    pub(crate) const PANIC: ErrorCode = ErrorCode { code: "panic" };
    pub(crate) const UNKNOWN_ERROR: ErrorCode = ErrorCode {
        code: "unknown-error",
    };
}

/// Coarse failure classes reported alongside the fine-grained [`ErrorCode`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ErrorKind {
    ValidationError,
    PayloadTooLarge,
    StagingFailure,
    NormalizationFailure,
    ClassificationFailure,
    StoreFailure,
    MalformedDescriptor,
    NotFound,
    Internal,
}
