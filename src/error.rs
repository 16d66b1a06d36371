//! Error types for fedora-fetch

use thiserror::Error;

/// Result type alias using fedora-fetch Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching and unpacking artifacts
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, caught before any network access
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote resource answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure talking to the compose server
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status other than 404
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Directory listing could not be interpreted
    #[error("HTML error: {0}")]
    Html(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unpacking or layer isolation errors
    #[error("Image layout error: {0}")]
    Oci(#[from] fedorafetch_oci::OciError),

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn transport(url: impl ToString, source: reqwest::Error) -> Self {
        Error::Transport {
            url: url.to_string(),
            source,
        }
    }
}
