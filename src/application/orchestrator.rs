//! The capture orchestrator: walks the shared timeline, skips finished work,
//! and recovers from session failures by logging in again on the next fetch.

use crate::adapters::local::SnapshotStore;
use crate::application::fetcher::fetch_segment;
use crate::domain::timeline::DEFAULT_INTERVAL_SECS;
use crate::domain::{Camera, CameraRegistry, SegmentRequest, Timeline};
use crate::error::{CaptureError, SessionError};
use crate::ports::{FrameExtractor, Session, SessionFactory};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// The orchestrator's hold on the video API.
///
/// A failed session is closed and dropped straight away, so "failed" and
/// "never opened" are the same state: the next fetch authenticates again.
#[derive(Default)]
pub enum SessionHandle {
    #[default]
    Absent,
    Active(Box<dyn Session>),
}

impl SessionHandle {
    fn take(&mut self) -> Option<Box<dyn Session>> {
        match std::mem::take(self) {
            SessionHandle::Active(session) => Some(session),
            SessionHandle::Absent => None,
        }
    }
}

/// How many extra attempts a timestamp gets after a session failure within one run.
///
/// The default of zero leaves failed timestamps for the next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_session_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_session_retries: 0,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Counters for one run. Informational only: the artifact tree stays the
/// sole record of what is finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub skipped: u64,
    pub captured: u64,
    pub fetch_failures: u64,
    pub extract_failures: u64,
    pub other_failures: u64,
    pub authentications: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped,
    Captured,
}

pub struct CaptureOrchestrator<F, X> {
    registry: CameraRegistry,
    store: SnapshotStore,
    interval: TimeDelta,
    retry: RetryPolicy,
    connector: F,
    extractor: X,
    session: SessionHandle,
    stats: RunStats,
}

impl<F, X> CaptureOrchestrator<F, X>
where
    F: SessionFactory,
    X: FrameExtractor,
{
    pub fn new(
        registry: CameraRegistry,
        output_root: impl Into<PathBuf>,
        connector: F,
        extractor: X,
    ) -> Self {
        Self {
            registry,
            store: SnapshotStore::new(output_root),
            interval: TimeDelta::seconds(DEFAULT_INTERVAL_SECS),
            retry: RetryPolicy::default(),
            connector,
            extractor,
            session: SessionHandle::Absent,
            stats: RunStats::default(),
        }
    }

    pub fn with_interval(mut self, interval: TimeDelta) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create one output directory per camera under the root.
    pub async fn prepare_directories(&self) -> io::Result<()> {
        for camera in self.registry.cameras() {
            self.store.prepare(camera).await?;
        }
        Ok(())
    }

    /// Walk every tick from the earliest camera start up to `now`.
    ///
    /// Cameras are offered each tick in declaration order, and the cursor
    /// moves only after all of them had their turn. No single failure ends
    /// the run.
    pub async fn run(&mut self, now: DateTime<Utc>) -> RunStats {
        self.stats = RunStats::default();
        let cameras = self.registry.cameras().to_vec();
        let start = self.registry.earliest_start();

        tracing::info!(
            cameras = cameras.len(),
            from = %start,
            until = %now,
            interval_secs = self.interval.num_seconds(),
            "starting timeline walk"
        );

        for tick in Timeline::new(start, self.interval, now) {
            self.stats.ticks += 1;
            for camera in cameras.iter().filter(|camera| camera.is_active_at(tick)) {
                let outcome = self.process(camera, tick).await;
                self.record(camera, tick, outcome);
            }
        }

        self.invalidate_session().await;
        self.stats
    }

    fn record(
        &mut self,
        camera: &Camera,
        tick: DateTime<Utc>,
        outcome: Result<Outcome, CaptureError>,
    ) {
        let timestamp = tick.timestamp_millis();
        match outcome {
            Ok(Outcome::Skipped) => self.stats.skipped += 1,
            Ok(Outcome::Captured) => self.stats.captured += 1,
            Err(CaptureError::Session(e)) => {
                self.stats.fetch_failures += 1;
                tracing::warn!(
                    camera = camera.name(),
                    timestamp,
                    error = %e,
                    "segment fetch failed, timestamp left for a later run"
                );
            }
            Err(CaptureError::Extract(e)) => {
                self.stats.extract_failures += 1;
                tracing::warn!(
                    camera = camera.name(),
                    timestamp,
                    error = %e,
                    "frame extraction failed, skipping timestamp"
                );
            }
            Err(e) => {
                self.stats.other_failures += 1;
                tracing::error!(
                    camera = camera.name(),
                    timestamp,
                    error = %e,
                    "capture failed"
                );
            }
        }
    }

    async fn process(
        &mut self,
        camera: &Camera,
        tick: DateTime<Utc>,
    ) -> Result<Outcome, CaptureError> {
        let path = self.store.artifact_path(camera, tick);
        let exists = self
            .store
            .contains(&path)
            .await
            .map_err(|source| CaptureError::Artifact {
                path: path.clone(),
                source,
            })?;
        if exists {
            tracing::debug!(
                camera = camera.name(),
                timestamp = tick.timestamp_millis(),
                "snapshot already exists"
            );
            return Ok(Outcome::Skipped);
        }

        let request = SegmentRequest::single_instant(camera, tick).ok_or_else(|| {
            CaptureError::OutOfRange {
                camera: camera.name().to_string(),
                at: tick,
            }
        })?;
        let segment = self.fetch_with_recovery(camera, tick, &request).await?;
        let image = self.extractor.extract(&segment).await?;
        self.store
            .persist(&path, image)
            .await
            .map_err(|source| CaptureError::Artifact {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            camera = camera.name(),
            timestamp = tick.timestamp_millis(),
            path = %path.display(),
            "snapshot saved"
        );
        Ok(Outcome::Captured)
    }

    async fn fetch_with_recovery(
        &mut self,
        camera: &Camera,
        tick: DateTime<Utc>,
        request: &SegmentRequest,
    ) -> Result<Bytes, SessionError> {
        let mut retries = 0;
        loop {
            match self.fetch_once(camera, request).await {
                Ok(segment) => return Ok(segment),
                Err(e) if retries < self.retry.max_session_retries => {
                    retries += 1;
                    tracing::warn!(
                        camera = camera.name(),
                        timestamp = tick.timestamp_millis(),
                        error = %e,
                        retry = retries,
                        "session failure, retrying with a new session"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One fetch on the live session. Any failure drops the session so the
    /// next attempt logs in again.
    async fn fetch_once(
        &mut self,
        camera: &Camera,
        request: &SegmentRequest,
    ) -> Result<Bytes, SessionError> {
        let session = self.ensure_session().await?;
        match fetch_segment(session.as_ref(), camera, request).await {
            Ok(segment) => {
                self.session = SessionHandle::Active(session);
                Ok(segment)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// Check out the live session, authenticating first if none is held.
    /// The handle is left `Absent` until the caller puts the session back.
    async fn ensure_session(&mut self) -> Result<Box<dyn Session>, SessionError> {
        if let Some(session) = self.session.take() {
            return Ok(session);
        }

        tracing::info!("authenticating with video API");
        let session = self.connector.connect().await?;
        self.stats.authentications += 1;
        Ok(session)
    }

    async fn invalidate_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
