//! `voodoo-player` - stream resolution and live playback sessions
//!
//! # Features
//!
//! - **Resolution**: validates `https://{host}/{live|live2|vod}/{user}/{stream}`
//!   URLs and builds the canonical backend URL per stream type
//! - **Availability polling**: cancellable `HEAD` polling until a live stream
//!   answers 200
//! - **Sessions**: a single-owner state machine that shows a placeholder
//!   while polling, switches to the live source, and loops on completion
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voodoo_player::{Configuration, SessionController, SessionState, TracingEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(TracingEngine::new());
//!     let session = SessionController::spawn_http(engine, Configuration::default())?;
//!     session.load_user_stream("alice", "5", true).await?;
//!     session.wait_for_state(SessionState::Playing).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http_client;
pub mod session;
pub mod stream;

pub use config::Configuration;
pub use error::{PlayerError, Result};
pub use session::{
    EngineEvent, PlaybackEngine, PresentationGuard, SessionController, SessionHandle,
    SessionSnapshot, SessionState, TimeControlStatus, TracingEngine,
};
pub use stream::{
    resolve, resolve_str, resolve_user_stream, AvailabilityCheck, AvailabilityPoller,
    HttpAvailabilityCheck, StreamDescriptor, StreamType,
};

/// Version of voodoo-player
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
