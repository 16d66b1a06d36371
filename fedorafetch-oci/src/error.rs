/// Errors produced while unpacking and isolating an image layout.
#[derive(Debug, thiserror::Error)]
pub enum OciError {
    #[error("layout error: {0}")]
    Layout(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("invalid digest: {0}")]
    Digest(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OciError>;
