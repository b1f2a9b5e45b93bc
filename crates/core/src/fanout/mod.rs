//! Progress fan-out to live-update sessions.
//!
//! One relay task holds a single pattern subscription over every progress
//! topic and hands each event to every registered session. There is no
//! per-video filtering; every session sees every event.

mod message;
mod registry;
mod relay;

pub use message::LiveMessage;
pub use registry::{SessionId, SessionRegistry};
pub use relay::ProgressRelay;
