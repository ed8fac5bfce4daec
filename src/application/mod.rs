//! Application layer - Services that drive the ports.

pub mod export;
pub mod fetcher;
pub mod orchestrator;

pub use orchestrator::{CaptureOrchestrator, RetryPolicy, RunStats, SessionHandle};
