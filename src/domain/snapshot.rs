//! Artifact naming.
//!
//! `<root>/<camera>/<camera>_<epochMillis>.jpg` is the only record of completed
//! work, so these names must never change.

use super::camera::Camera;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub const ARTIFACT_EXTENSION: &str = "jpg";

pub fn artifact_file_name(camera_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        camera_name,
        at.timestamp_millis(),
        ARTIFACT_EXTENSION
    )
}

pub fn artifact_path(root: &Path, camera: &Camera, at: DateTime<Utc>) -> PathBuf {
    camera
        .directory(root)
        .join(artifact_file_name(camera.name(), at))
}
