//! Protect Timelapse - Snapshot archiver for session-authenticated video APIs
//!
//! Walks a per-camera time window at a fixed cadence, turns a short video
//! segment into one still per tick, and treats files already on disk as
//! finished work so any run can be resumed.
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (cameras, timeline, segment requests, artifact naming)
//! - ports/: Trait definitions (session, frame extractor)
//! - adapters/: Concrete implementations (HTTPS console, ffmpeg, filesystem)
//! - application/: Capture orchestrator and one-off exports
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;

// Re-exports for convenience
pub use application::{CaptureOrchestrator, RetryPolicy, RunStats};
pub use config::{ExportConfig, TimelapseConfig};
pub use domain::{Camera, CameraRegistry};
