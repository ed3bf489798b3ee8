//! Error types for stream resolution and session control.

use thiserror::Error;

/// Errors surfaced to callers of the player API.
///
/// Transient availability failures are never represented here: the poller
/// absorbs them and retries.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Input URL failed host, path-shape or stream-type validation.
    #[error("invalid stream URL: {0}")]
    InvalidStreamUrl(String),

    /// Convenience loader was called with an empty user id.
    #[error("wrong user id: user id must not be empty")]
    WrongUserId,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session actor has shut down and can no longer accept commands.
    #[error("playback session is closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, PlayerError>;
