//! Playback session controller.
//!
//! All session state lives on one actor task. Caller requests, poller
//! callbacks and engine events are turned into [`Command`]s on a single
//! channel and applied strictly in arrival order, so no two operations
//! ever mutate the session concurrently.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use url::Url;
use uuid::Uuid;

use super::engine::{EngineEvent, EngineEventSender, PlaybackEngine, PlayerItem, TimeControlStatus};
use super::state::{SessionSnapshot, SessionState, Transition};
use crate::config::Configuration;
use crate::error::{PlayerError, Result};
use crate::stream::availability::{AvailabilityPoller, HttpAvailabilityCheck, PollHandle};
use crate::stream::descriptor::{resolve_user_stream, StreamDescriptor};

type Reply = oneshot::Sender<()>;

pub(crate) enum Command {
    Load {
        descriptor: Box<StreamDescriptor>,
        reply: Reply,
    },
    Play {
        reply: Reply,
    },
    Pause {
        reply: Reply,
    },
    TogglePlayback {
        reply: Reply,
    },
    Reset {
        reply: Reply,
    },
    AttachPresentation {
        dismissed: oneshot::Receiver<()>,
        reply: Reply,
    },
    PresentationDismissed {
        id: u64,
    },
    StreamAvailable {
        generation: u64,
        url: Url,
    },
    Engine(EngineEvent),
    Shutdown {
        reply: Reply,
    },
}

/// Single-owner session state machine.
pub struct SessionController {
    engine: Arc<dyn PlaybackEngine>,
    poller: AvailabilityPoller,
    commands: WeakUnboundedSender<Command>,
    snapshot: watch::Sender<SessionSnapshot>,
    transitions: broadcast::Sender<Transition>,

    state: SessionState,
    descriptor: Option<StreamDescriptor>,
    current_item: Option<Url>,
    is_presented: bool,
    is_playing: bool,
    is_playback_complete: bool,
    should_auto_play: bool,
    should_loop: bool,

    poll: Option<PollHandle>,
    /// Bumped on every load and reset; availability from an older
    /// generation is ignored.
    generation: u64,
    presentation: Option<u64>,
    next_presentation: u64,
    subscribed: bool,
}

impl SessionController {
    /// Spawn a session actor on the current runtime.
    pub fn spawn(
        engine: Arc<dyn PlaybackEngine>,
        poller: AvailabilityPoller,
        config: Configuration,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (transitions, _) = broadcast::channel(64);
        let id = Uuid::new_v4();

        let controller = Self {
            engine,
            poller,
            commands: tx.downgrade(),
            snapshot,
            transitions: transitions.clone(),
            state: SessionState::Idle,
            descriptor: None,
            current_item: None,
            is_presented: false,
            is_playing: false,
            is_playback_complete: false,
            should_auto_play: false,
            should_loop: false,
            poll: None,
            generation: 0,
            presentation: None,
            next_presentation: 0,
            subscribed: false,
        };

        tokio::spawn(
            controller
                .run(rx)
                .instrument(info_span!("session", id = %id)),
        );

        SessionHandle {
            id,
            commands: tx,
            snapshot: snapshot_rx,
            transitions,
            config: Arc::new(config),
        }
    }

    /// Spawn a session that probes availability over HTTP.
    pub fn spawn_http(engine: Arc<dyn PlaybackEngine>, config: Configuration) -> Result<SessionHandle> {
        let checker = Arc::new(HttpAvailabilityCheck::new()?);
        Ok(Self::spawn(engine, AvailabilityPoller::new(checker), config))
    }

    async fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        info!("Session started");

        while let Some(command) = commands.recv().await {
            let (reply, flow) = self.handle(command).await;
            self.publish();
            if let Some(reply) = reply {
                let _ = reply.send(());
            }
            if flow.is_break() {
                break;
            }
        }

        if self.state != SessionState::Idle || self.poll.is_some() {
            self.reset().await;
            self.publish();
        }
        info!("Session ended");
    }

    async fn handle(&mut self, command: Command) -> (Option<Reply>, ControlFlow<()>) {
        let reply = match command {
            Command::Load { descriptor, reply } => {
                self.load(*descriptor).await;
                Some(reply)
            }
            Command::Play { reply } => {
                self.engine.play().await;
                Some(reply)
            }
            Command::Pause { reply } => {
                self.engine.pause().await;
                Some(reply)
            }
            Command::TogglePlayback { reply } => {
                self.toggle_playback().await;
                Some(reply)
            }
            Command::Reset { reply } => {
                self.reset().await;
                Some(reply)
            }
            Command::AttachPresentation { dismissed, reply } => {
                self.attach_presentation(dismissed);
                Some(reply)
            }
            Command::PresentationDismissed { id } => {
                if self.presentation == Some(id) {
                    info!("Presentation dismissed, resetting session");
                    self.reset().await;
                }
                None
            }
            Command::StreamAvailable { generation, url } => {
                self.stream_available(generation, url).await;
                None
            }
            Command::Engine(event) => {
                self.engine_event(event).await;
                None
            }
            Command::Shutdown { reply } => {
                self.reset().await;
                return (Some(reply), ControlFlow::Break(()));
            }
        };
        (reply, ControlFlow::Continue(()))
    }

    async fn load(&mut self, descriptor: StreamDescriptor) {
        self.stop_polling().await;
        self.generation += 1;
        self.ensure_subscribed();

        info!(
            stream = %descriptor.id,
            user = %descriptor.user_id,
            kind = %descriptor.stream_type,
            placeholder = descriptor.has_placeholder(),
            "Loading stream"
        );

        if let Some(placeholder) = descriptor.placeholder_url.clone() {
            self.should_auto_play = true;
            self.should_loop = true;
            self.transition(SessionState::LoadingPlaceholder);
            self.load_item(placeholder).await;
            self.start_polling(descriptor.canonical_url.clone());
            self.transition(SessionState::Polling);
        } else {
            self.load_item(descriptor.canonical_url.clone()).await;
            self.transition(SessionState::Playing);
        }

        self.descriptor = Some(descriptor);
        self.is_presented = true;
    }

    async fn load_item(&mut self, url: Url) {
        self.is_playback_complete = false;
        self.current_item = Some(url.clone());
        self.engine.replace_item(Some(PlayerItem::new(url))).await;
        if self.should_auto_play {
            self.engine.play().await;
        }
    }

    fn start_polling(&mut self, url: Url) {
        let generation = self.generation;
        let commands = self.commands.clone();
        let on_available = move |url: Url| {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::StreamAvailable { generation, url });
            }
        };
        self.poll = Some(self.poller.start(url, on_available, CancellationToken::new()));
    }

    async fn stop_polling(&mut self) {
        if let Some(handle) = self.poll.take() {
            let outcome = handle.cancel_and_wait().await;
            debug!(?outcome, "Stopped availability poll");
        }
    }

    async fn stream_available(&mut self, generation: u64, url: Url) {
        if generation != self.generation || !self.state.is_waiting_for_live() {
            debug!(
                generation,
                current = self.generation,
                "Ignoring availability from a superseded poll"
            );
            return;
        }

        self.poll = None;
        info!(%url, "Switching to live stream");
        self.transition(SessionState::LiveAvailable);
        self.should_auto_play = true;
        self.load_item(url).await;
        self.transition(SessionState::Playing);
    }

    async fn toggle_playback(&mut self) {
        if self.engine.time_control_status() == TimeControlStatus::Paused {
            self.engine.play().await;
        } else {
            self.engine.pause().await;
        }
    }

    async fn engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::TimeControlChanged(status) => {
                self.is_playing = status == TimeControlStatus::Playing;
            }
            EngineEvent::ItemFinished => self.item_finished().await,
            EngineEvent::InterruptionEnded { should_resume } => {
                if should_resume && self.current_item.is_some() {
                    info!("Interruption ended, resuming playback");
                    self.engine.play().await;
                }
            }
        }
    }

    async fn item_finished(&mut self) {
        if self.current_item.is_none() {
            debug!("Ignoring item finished without an active item");
            return;
        }

        // The placeholder keeps cycling until the live stream shows up.
        if self.state.is_waiting_for_live() {
            if self.should_loop {
                self.engine.seek_to_start().await;
                self.engine.play().await;
            }
            return;
        }

        self.is_playback_complete = true;
        self.transition(SessionState::Complete);

        if self.should_loop {
            debug!("Looping current item");
            self.engine.seek_to_start().await;
            self.engine.play().await;
            self.transition(SessionState::Playing);
        }
    }

    fn attach_presentation(&mut self, dismissed: oneshot::Receiver<()>) {
        self.next_presentation += 1;
        let id = self.next_presentation;
        self.presentation = Some(id);

        let commands = self.commands.clone();
        tokio::spawn(
            async move {
                if dismissed.await.is_ok() {
                    if let Some(tx) = commands.upgrade() {
                        let _ = tx.send(Command::PresentationDismissed { id });
                    }
                }
            }
            .in_current_span(),
        );
    }

    fn ensure_subscribed(&mut self) {
        if self.subscribed {
            return;
        }
        self.engine
            .subscribe(EngineEventSender::new(self.commands.clone()));
        self.subscribed = true;
    }

    async fn reset(&mut self) {
        self.stop_polling().await;
        self.generation += 1;

        self.current_item = None;
        self.descriptor = None;
        self.engine.replace_item(None).await;
        if self.subscribed {
            self.engine.unsubscribe();
            self.subscribed = false;
        }
        self.presentation = None;

        self.is_presented = false;
        self.is_playing = false;
        self.is_playback_complete = false;
        self.should_auto_play = false;
        self.should_loop = false;
        self.transition(SessionState::Idle);
    }

    fn transition(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to);
        debug!(%from, %to, "Session transition");
        let _ = self.transitions.send(Transition { from, to });
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            state: self.state,
            current_item: self.current_item.clone(),
            descriptor: self.descriptor.clone(),
            is_presented: self.is_presented,
            is_playing: self.is_playing,
            is_playback_complete: self.is_playback_complete,
            should_auto_play: self.should_auto_play,
            should_loop: self.should_loop,
            is_polling: self.poll.is_some(),
        });
    }
}

/// Caller-side handle to a running session.
///
/// Cheap to clone. The session shuts down once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    transitions: broadcast::Sender<Transition>,
    config: Arc<Configuration>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| PlayerError::SessionClosed)?;
        done.await.map_err(|_| PlayerError::SessionClosed)
    }

    /// Load a resolved stream, replacing whatever was loaded before.
    pub async fn load(&self, descriptor: StreamDescriptor) -> Result<()> {
        self.request(|reply| Command::Load {
            descriptor: Box::new(descriptor),
            reply,
        })
        .await
    }

    /// Resolve `url` against the session configuration and load it.
    pub async fn load_url(&self, url: &Url, placeholder_url: Option<Url>) -> Result<()> {
        let descriptor = StreamDescriptor::with_placeholder(url, placeholder_url, &self.config)?;
        self.load(descriptor).await
    }

    /// Load a user's `live2` stream, optionally behind the preview clip.
    pub async fn load_user_stream(
        &self,
        user_id: &str,
        stream_id: &str,
        show_preview: bool,
    ) -> Result<()> {
        let descriptor = resolve_user_stream(user_id, stream_id, show_preview, &self.config)?;
        self.load(descriptor).await
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| Command::Play { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Play if the engine reports paused, pause otherwise.
    pub async fn toggle_playback(&self) -> Result<()> {
        self.request(|reply| Command::TogglePlayback { reply }).await
    }

    /// Cancel polling, unload the engine and return to `Idle`.
    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Bind a presentation surface; dismissing it resets the session.
    pub async fn attach_presentation(&self) -> Result<PresentationGuard> {
        let (dismiss, dismissed) = oneshot::channel();
        self.request(|reply| Command::AttachPresentation { dismissed, reply })
            .await?;
        Ok(PresentationGuard { dismiss })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn transitions(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// Sender the playback engine uses to report events to this session.
    pub fn engine_events(&self) -> EngineEventSender {
        EngineEventSender::new(self.commands.downgrade())
    }

    /// Wait until the published snapshot matches `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| PlayerError::SessionClosed)?
            .clone();
        Ok(snapshot)
    }

    pub async fn wait_for_state(&self, state: SessionState) -> Result<SessionSnapshot> {
        self.wait_until(|s| s.state == state).await
    }

    /// Reset and stop the session actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// One-shot binding to a presentation surface.
///
/// Calling [`dismiss`](Self::dismiss) tells the session the surface went
/// away. Dropping the guard without dismissing leaves the session alone.
pub struct PresentationGuard {
    dismiss: oneshot::Sender<()>,
}

impl PresentationGuard {
    pub fn dismiss(self) {
        let _ = self.dismiss.send(());
    }
}
