use rand::RngCore;

use crate::{classify::Orientation, error_code::ErrorCode};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub(crate) enum KeyError {
    #[error("No file extension is known for {0}")]
    UnsupportedContentType(mime::Mime),
}

impl KeyError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedContentType(_) => ErrorCode::UNSUPPORTED_EXTENSION,
        }
    }
}

/// The extension stored videos carry, for the content types tubely accepts
pub(crate) fn video_extension(content_type: &mime::Mime) -> Option<&'static str> {
    match content_type.essence_str() {
        "video/mp4" => Some(".mp4"),
        _ => None,
    }
}

/// Build `<orientation>/<64 hex characters><extension>`
///
/// Keys are never checked against the store; uniqueness comes from 256 random bits.
pub(crate) fn derive_key(
    orientation: Orientation,
    content_type: &mime::Mime,
) -> Result<String, KeyError> {
    let extension = video_extension(content_type)
        .ok_or_else(|| KeyError::UnsupportedContentType(content_type.clone()))?;

    let mut token = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut token);

    Ok(format!(
        "{}/{}{extension}",
        orientation.prefix(),
        hex::encode(token)
    ))
}
