use thiserror::Error;

/// Validation errors raised before any storage call is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("album name must not be empty")]
    EmptyAlbumName,

    #[error("entry title must not be empty")]
    EmptyEntryTitle,

    #[error("upload {name} is empty")]
    EmptyFile { name: String },

    #[error("upload {name} has unsupported content type {content_type}")]
    UnsupportedMediaType { name: String, content_type: String },

    #[error("upload {name} is {size} bytes, limit is {limit}")]
    FileTooLarge { name: String, size: usize, limit: usize },

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
