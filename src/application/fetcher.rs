use crate::domain::{Camera, SegmentRequest};
use crate::error::SessionError;
use crate::ports::Session;
use bytes::Bytes;

/// Fetch the segment described by `request` for `camera`.
///
/// The request already carries the camera's clock offset, see
/// [`SegmentRequest::for_window`].
pub async fn fetch_segment(
    session: &dyn Session,
    camera: &Camera,
    request: &SegmentRequest,
) -> Result<Bytes, SessionError> {
    tracing::debug!(
        camera = camera.name(),
        start = request.start_millis,
        end = request.end_millis,
        "requesting segment"
    );

    let segment = session.fetch_segment(request).await?;

    tracing::debug!(
        camera = camera.name(),
        bytes = segment.len(),
        "segment downloaded"
    );
    Ok(segment)
}
