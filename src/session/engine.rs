//! Playback engine seam.
//!
//! The session controller never decodes or renders anything itself. It
//! drives an external [`PlaybackEngine`] and learns about playback progress
//! through [`EngineEvent`]s the engine pushes back.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::{debug, info};
use url::Url;

use super::controller::Command;

/// Engine-reported playback control status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControlStatus {
    #[default]
    Paused,
    /// Playback requested but stalled (buffering, network).
    WaitingToPlay,
    Playing,
}

/// Signals the engine sends to the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The current item played to its end.
    ItemFinished,
    /// The engine's control status changed.
    TimeControlChanged(TimeControlStatus),
    /// An external interruption (phone call, system alert) ended.
    InterruptionEnded { should_resume: bool },
}

/// A source handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerItem {
    pub url: Url,
    /// How much media the engine should buffer ahead of the playhead.
    pub preferred_forward_buffer: Duration,
}

impl PlayerItem {
    pub const DEFAULT_FORWARD_BUFFER: Duration = Duration::from_secs(1);

    pub fn new(url: Url) -> Self {
        Self {
            url,
            preferred_forward_buffer: Self::DEFAULT_FORWARD_BUFFER,
        }
    }
}

/// Channel an engine uses to report [`EngineEvent`]s.
///
/// Holds only a weak reference to the session, so an engine keeping a
/// sender around does not keep the session alive.
#[derive(Clone)]
pub struct EngineEventSender {
    inner: WeakUnboundedSender<Command>,
}

impl EngineEventSender {
    pub(crate) fn new(inner: WeakUnboundedSender<Command>) -> Self {
        Self { inner }
    }

    /// Deliver an event. Returns `false` once the session is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|tx| tx.send(Command::Engine(event)).is_ok())
    }
}

/// External video engine driven by the session controller.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Replace the current item; `None` unloads the engine.
    async fn replace_item(&self, item: Option<PlayerItem>);

    async fn play(&self);

    async fn pause(&self);

    /// Seek back to the beginning of the current item.
    async fn seek_to_start(&self);

    fn time_control_status(&self) -> TimeControlStatus;

    /// Start delivering events to the session.
    fn subscribe(&self, events: EngineEventSender);

    /// Stop delivering events and drop the sender.
    fn unsubscribe(&self);
}

/// Headless engine that only logs what it is asked to do.
///
/// Used by the CLI to exercise a session without a renderer attached.
#[derive(Default)]
pub struct TracingEngine {
    status: Mutex<TimeControlStatus>,
    events: Mutex<Option<EngineEventSender>>,
}

impl TracingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_status(&self, status: TimeControlStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
        if let Ok(events) = self.events.lock() {
            if let Some(sender) = events.as_ref() {
                sender.send(EngineEvent::TimeControlChanged(status));
            }
        }
    }
}

#[async_trait]
impl PlaybackEngine for TracingEngine {
    async fn replace_item(&self, item: Option<PlayerItem>) {
        match item {
            Some(item) => info!(url = %item.url, buffer = ?item.preferred_forward_buffer, "Engine: replace item"),
            None => {
                info!("Engine: unload");
                self.set_status(TimeControlStatus::Paused);
            }
        }
    }

    async fn play(&self) {
        info!("Engine: play");
        self.set_status(TimeControlStatus::Playing);
    }

    async fn pause(&self) {
        info!("Engine: pause");
        self.set_status(TimeControlStatus::Paused);
    }

    async fn seek_to_start(&self) {
        debug!("Engine: seek to start");
    }

    fn time_control_status(&self) -> TimeControlStatus {
        self.status.lock().map(|s| *s).unwrap_or_default()
    }

    fn subscribe(&self, events: EngineEventSender) {
        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(events);
        }
    }

    fn unsubscribe(&self) {
        if let Ok(mut slot) = self.events.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_item_default_buffer() {
        let item = PlayerItem::new(Url::parse("https://example.com/a.m3u8").unwrap());
        assert_eq!(item.preferred_forward_buffer, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tracing_engine_tracks_status() {
        let engine = TracingEngine::new();
        assert_eq!(engine.time_control_status(), TimeControlStatus::Paused);
        engine.play().await;
        assert_eq!(engine.time_control_status(), TimeControlStatus::Playing);
        engine.pause().await;
        assert_eq!(engine.time_control_status(), TimeControlStatus::Paused);
    }

    #[tokio::test]
    async fn test_event_sender_reports_closed_session() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Command>();
        let sender = EngineEventSender::new(tx.downgrade());
        assert!(sender.send(EngineEvent::ItemFinished));
        drop(rx);
        drop(tx);
        assert!(!sender.send(EngineEvent::ItemFinished));
    }
}
