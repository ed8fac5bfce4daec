use crate::error::ExtractError;
use crate::ports::FrameExtractor;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Extracts the first frame of a segment with an external `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegExtractor {
    program: PathBuf,
    timeout: Duration,
    scratch_dir: Option<PathBuf>,
}

impl FfmpegExtractor {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            scratch_dir: None,
        }
    }

    /// Directory for the temporary input file. Defaults to the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn command(&self, input: &Path) -> Command {
        // First frame, highest JPEG quality, written to stdout.
        let mut command = Command::new(&self.program);
        command
            .arg("-y")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-frames:v", "1"])
            .args(["-q:v", "1"])
            .args(["-f", "image2pipe"])
            .args(["-vcodec", "mjpeg"])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract(&self, segment: &[u8]) -> Result<Bytes, ExtractError> {
        // Removed when `input` drops, whichever way this function exits.
        let mut builder = tempfile::Builder::new();
        builder.prefix("segment-").suffix(".mp4");
        let input = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tokio::fs::write(input.path(), segment).await?;

        let child = self
            .command(input.path())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                tool: self.program.display().to_string(),
                source,
            })?;

        // On timeout the future is dropped with the child, and kill_on_drop reaps it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ExtractError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr.trim(), "frame tool failed");
            return Err(ExtractError::ExtractionFailed {
                status: output.status,
            });
        }
        if output.stdout.is_empty() {
            return Err(ExtractError::EmptyOutput);
        }

        Ok(Bytes::from(output.stdout))
    }
}
