use crate::error::ExtractError;
use async_trait::async_trait;
use bytes::Bytes;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Turn a video segment into a single still image (JPEG).
    async fn extract(&self, segment: &[u8]) -> Result<Bytes, ExtractError>;
}
