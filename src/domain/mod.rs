//! Domain layer - Pure capture logic.

pub mod camera;
pub mod segment;
pub mod snapshot;
pub mod timeline;

pub use camera::{
    clock_offset_from_millis, Camera, CameraEntry, CameraRegistry, MAX_CLOCK_OFFSET_MS,
};
pub use segment::SegmentRequest;
pub use timeline::Timeline;
