//! Playback session control
//!
//! A session owns the lifecycle of one loaded stream: placeholder while
//! polling, switch to the live source, completion and looping, reset.

pub mod controller;
pub mod engine;
pub mod state;

pub use controller::{PresentationGuard, SessionController, SessionHandle};
pub use engine::{
    EngineEvent, EngineEventSender, PlaybackEngine, PlayerItem, TimeControlStatus, TracingEngine,
};
pub use state::{SessionSnapshot, SessionState, Transition};
