use crate::domain::SegmentRequest;
use crate::error::{CaptureError, SessionError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// An authenticated connection to the video API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send + Sync {
    /// Fetch the clip covering `[start_millis, end_millis]` into memory.
    async fn fetch_segment(&self, request: &SegmentRequest) -> Result<Bytes, SessionError>;

    /// Fetch a clip and write it to `output`, returning the number of bytes written.
    async fn download_segment(
        &self,
        request: &SegmentRequest,
        output: &Path,
    ) -> Result<u64, CaptureError>;

    /// Release the session. Best effort, never fails.
    async fn close(&self);
}

/// Builds and authenticates new sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, SessionError>;
}
