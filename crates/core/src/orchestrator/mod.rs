//! Download orchestrator.
//!
//! Runs one job end to end: pre-start cancellation check, cleanup, the
//! blocking extractor call with progress and cooperative cancellation, and
//! the final record commit.

mod cancel_gate;
mod config;
mod download;
mod types;

pub use cancel_gate::CancelGate;
pub use config::OrchestratorConfig;
pub use download::{DownloadOrchestrator, CANCELLED_MESSAGE, FAILURE_MESSAGE_MAX_CHARS};
pub use types::{OrchestratorError, Outcome};
