//! Error types, one enum per concern.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;

/// Startup problems. Any of these aborts the run before a single tick is walked.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("could not read camera file {path:?}: {source}")]
    CameraFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse camera file: {0}")]
    CameraFormat(#[from] serde_json::Error),

    #[error("camera registry is empty")]
    NoCameras,

    #[error("camera #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("camera {name} starts after it ends")]
    InvertedWindow { name: String },

    #[error("camera name {0} is declared twice")]
    DuplicateName(String),

    #[error("camera name {0} is not a valid directory name")]
    UnsafeName(String),

    #[error("camera {name} has a clock offset outside ±{max_ms} ms")]
    OffsetOutOfRange { name: String, max_ms: i64 },
}

/// Failures of the authenticated video API. The orchestrator handles every
/// variant the same way; the split only exists for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("segment unavailable (status {status})")]
    SegmentUnavailable { status: StatusCode },

    #[error("session expired (status {status})")]
    SessionExpired { status: StatusCode },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Frame extraction failures. Never retried within a run.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not start frame tool {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("frame tool exited with {status}")]
    ExtractionFailed { status: std::process::ExitStatus },

    #[error("frame tool produced no image")]
    EmptyOutput,

    #[error("frame tool timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a single `(camera, timestamp)` attempt did not produce an artifact.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("request for camera {camera} at {at} is out of range")]
    OutOfRange { camera: String, at: DateTime<Utc> },

    #[error("could not store artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
