//! Stream resolution and live availability polling
//!
//! Turns input URLs into [`StreamDescriptor`]s and watches canonical URLs
//! until the backend reports them live.

pub mod availability;
pub mod descriptor;

pub use availability::{
    AvailabilityCheck, AvailabilityPoller, HttpAvailabilityCheck, PollHandle, PollOutcome,
};
pub use descriptor::{resolve, resolve_str, resolve_user_stream, StreamDescriptor, StreamType};
