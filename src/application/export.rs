//! One-off exports: a raw clip, or a single still, for one camera.

use crate::application::fetcher::fetch_segment;
use crate::domain::{Camera, SegmentRequest};
use crate::error::CaptureError;
use crate::ports::{FrameExtractor, Session};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Stream the clip covering `[start, end]` to `output`.
pub async fn export_clip(
    session: &dyn Session,
    camera: &Camera,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    output: &Path,
) -> Result<u64, CaptureError> {
    let request = SegmentRequest::for_window(camera, start, end).ok_or_else(|| {
        CaptureError::OutOfRange {
            camera: camera.name().to_string(),
            at: start,
        }
    })?;
    let written = session.download_segment(&request, output).await?;
    tracing::info!(
        camera = camera.name(),
        bytes = written,
        path = %output.display(),
        "clip exported"
    );
    Ok(written)
}

/// Extract the still at `at` and write it to `output`, replacing any existing file.
pub async fn export_snapshot(
    session: &dyn Session,
    extractor: &dyn FrameExtractor,
    camera: &Camera,
    at: DateTime<Utc>,
    output: &Path,
) -> Result<(), CaptureError> {
    let request =
        SegmentRequest::single_instant(camera, at).ok_or_else(|| CaptureError::OutOfRange {
            camera: camera.name().to_string(),
            at,
        })?;
    let segment = fetch_segment(session, camera, &request).await?;
    let image = extractor.extract(&segment).await?;

    let artifact_error = |source| CaptureError::Artifact {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(artifact_error)?;
    }
    tokio::fs::write(output, &image)
        .await
        .map_err(artifact_error)?;

    tracing::info!(camera = camera.name(), path = %output.display(), "snapshot exported");
    Ok(())
}
