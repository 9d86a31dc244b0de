use std::{fmt::Display, str::FromStr};

use crate::error_code::ErrorCode;

/// The location of a stored video, persisted in a record as `bucket,key`
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ObjectDescriptor {
    bucket: String,
    key: String,
}

#[derive(Debug, thiserror::Error)]
#[error("Stored video location {0:?} is not of the form bucket,key")]
pub(crate) struct DescriptorError(String);

impl DescriptorError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        ErrorCode::MALFORMED_DESCRIPTOR
    }
}

impl ObjectDescriptor {
    pub(crate) fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        ObjectDescriptor {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

impl FromStr for ObjectDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(ObjectDescriptor::new(bucket, key))
            }
            _ => Err(DescriptorError(s.to_string())),
        }
    }
}

impl Display for ObjectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.bucket, self.key)
    }
}
