//! Local adapters: the artifact tree and the frame tool.

pub mod ffmpeg;
pub mod fs;

pub use ffmpeg::FfmpegExtractor;
pub use fs::SnapshotStore;
