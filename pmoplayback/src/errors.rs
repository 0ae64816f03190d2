use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of stream failure a session can end up in.
///
/// The retry policy treats all four the same unless
/// `retry.fail_fast_on_unavailable` is enabled.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum StreamErrorKind {
    #[error("stream unavailable")]
    StreamUnavailable,
    #[error("network connection lost")]
    NetworkLost,
    #[error("decoding failed")]
    DecodingFailed,
    #[error("unknown playback error: {0}")]
    Unknown(String),
}

impl StreamErrorKind {
    /// Message suitable for the error screen.
    pub fn user_message(&self) -> String {
        match self {
            StreamErrorKind::StreamUnavailable => {
                "This stream is not available. Check the channel address or try again later."
                    .to_string()
            }
            StreamErrorKind::NetworkLost => {
                "The network connection was lost while playing this stream.".to_string()
            }
            StreamErrorKind::DecodingFailed => {
                "The stream could not be decoded by the player.".to_string()
            }
            StreamErrorKind::Unknown(message) => format!("Playback failed: {message}"),
        }
    }
}

/// Failure of a command sent to a backend adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Cannot launch player '{0}': {1}")]
    Launch(String, std::io::Error),
    #[error("Backend operation '{0}' is not supported by engine '{1}'")]
    Unsupported(String, String),
    #[error("Backend port is closed")]
    PortClosed,
    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    pub fn unsupported(operation: &str, engine: &str) -> Self {
        BackendError::Unsupported(operation.to_string(), engine.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Playback session is closed")]
    SessionClosed,
    #[error("Stream routing failed: {0}")]
    Routing(String),
    #[error("Unsupported stream URL: {0}")]
    UnsupportedUrl(String),
    #[error("Channel directory error: {0}")]
    Directory(String),
    #[error("Progress store error: {0}")]
    Progress(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
