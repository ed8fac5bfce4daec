use crate::domain::snapshot::artifact_path;
use crate::domain::Camera;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// The on-disk artifact tree. An artifact's presence is the completion marker,
/// so files are only ever added, never rewritten.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn artifact_path(&self, camera: &Camera, at: DateTime<Utc>) -> PathBuf {
        artifact_path(&self.root, camera, at)
    }

    /// Create the camera's output directory.
    pub async fn prepare(&self, camera: &Camera) -> io::Result<()> {
        tokio::fs::create_dir_all(camera.directory(&self.root)).await
    }

    pub async fn contains(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    /// Write `image` to `path` without ever replacing an existing file.
    ///
    /// The bytes are staged in a hidden temp file in the same directory and
    /// then linked into place, so a crash never leaves a partial artifact
    /// that a later run would mistake for finished work.
    pub async fn persist(&self, path: &Path, image: Bytes) -> io::Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let dir = path.parent().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no parent")
            })?;
            std::fs::create_dir_all(dir)?;

            let mut staged = tempfile::Builder::new()
                .prefix(".")
                .suffix(".part")
                .tempfile_in(dir)?;
            staged.write_all(&image)?;
            staged.as_file().sync_all()?;
            staged.persist_noclobber(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Save a `Stream` of body chunks to a file, returning the number of bytes written.
pub async fn stream_to_file<S, E>(path: &Path, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;

    Ok(written)
}
