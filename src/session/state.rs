//! Session state and the read-only views published to observers.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::stream::StreamDescriptor;

/// Lifecycle of one loaded stream.
///
/// `Idle → LoadingPlaceholder → Polling → LiveAvailable → Playing ⇄ Complete`;
/// a load without a placeholder goes from `Idle` straight to `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    LoadingPlaceholder,
    Polling,
    LiveAvailable,
    Playing,
    Complete,
}

impl SessionState {
    /// `true` while the placeholder is shown and the live stream is pending.
    pub fn is_waiting_for_live(self) -> bool {
        matches!(self, Self::LoadingPlaceholder | Self::Polling)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoadingPlaceholder => "loading-placeholder",
            Self::Polling => "polling",
            Self::LiveAvailable => "live-available",
            Self::Playing => "playing",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// A single state change, broadcast in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
}

/// Observer view of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Source currently handed to the engine.
    pub current_item: Option<Url>,
    pub descriptor: Option<StreamDescriptor>,
    pub is_presented: bool,
    /// Mirrors the engine's reported control status.
    pub is_playing: bool,
    pub is_playback_complete: bool,
    pub should_auto_play: bool,
    pub should_loop: bool,
    /// A poll for live availability is running.
    pub is_polling: bool,
}
