use super::camera::Camera;
use chrono::{DateTime, Utc};

/// Parameters of one video export call, with the camera's clock offset
/// already applied to both endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRequest {
    pub camera_id: String,
    pub start_millis: i64,
    pub end_millis: i64,
}

impl SegmentRequest {
    /// `None` when the corrected window falls outside the representable time range.
    pub fn for_window(camera: &Camera, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        let offset = camera.clock_offset();
        Some(Self {
            camera_id: camera.id().to_string(),
            start_millis: start.checked_add_signed(offset)?.timestamp_millis(),
            end_millis: end.checked_add_signed(offset)?.timestamp_millis(),
        })
    }

    /// `start == end`: the API answers with the smallest clip containing the instant.
    pub fn single_instant(camera: &Camera, at: DateTime<Utc>) -> Option<Self> {
        Self::for_window(camera, at, at)
    }
}
