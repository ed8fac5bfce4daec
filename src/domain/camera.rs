use crate::error::ConfigError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Largest clock correction accepted in either direction: one day.
pub const MAX_CLOCK_OFFSET_MS: i64 = 86_400_000;

/// Build a clock offset, or `None` when `millis` is beyond [`MAX_CLOCK_OFFSET_MS`].
pub fn clock_offset_from_millis(millis: i64) -> Option<TimeDelta> {
    if !(-MAX_CLOCK_OFFSET_MS..=MAX_CLOCK_OFFSET_MS).contains(&millis) {
        return None;
    }
    TimeDelta::try_milliseconds(millis)
}

/// A camera and the window during which its footage is worth capturing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    /// Human-readable name, used for directories, file names and logs
    name: String,
    /// Provider-assigned id, used in API calls
    id: String,
    /// First instant with usable footage (inclusive)
    start: DateTime<Utc>,
    /// Last instant with usable footage (inclusive)
    end: DateTime<Utc>,
    /// Correction added to every instant sent to the API
    clock_offset: TimeDelta,
}

impl Camera {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            start,
            end,
            clock_offset: TimeDelta::zero(),
        }
    }

    pub fn with_clock_offset(mut self, clock_offset: TimeDelta) -> Self {
        self.clock_offset = clock_offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn clock_offset(&self) -> TimeDelta {
        self.clock_offset
    }

    /// True when `at` falls inside `[start, end]`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Output directory for this camera's artifacts.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(&self.name)
    }
}

/// One entry of the camera registry file.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraEntry {
    pub name: String,
    pub id: String,
    pub start: DateTime<Utc>,
    /// Defaults to the run's captured "now"
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Defaults to the globally configured offset
    #[serde(default)]
    pub clock_offset_ms: Option<i64>,
}

/// The immutable, validated list of cameras, in declaration order.
#[derive(Debug, Clone)]
pub struct CameraRegistry {
    cameras: Vec<Camera>,
}

impl CameraRegistry {
    pub fn new(cameras: Vec<Camera>) -> Result<Self, ConfigError> {
        if cameras.is_empty() {
            return Err(ConfigError::NoCameras);
        }

        let max_offset = TimeDelta::milliseconds(MAX_CLOCK_OFFSET_MS);
        let mut names = HashSet::new();
        for (index, camera) in cameras.iter().enumerate() {
            if camera.name.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    index,
                    field: "name",
                });
            }
            if camera.id.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "id" });
            }
            if !name_is_valid(&camera.name) {
                return Err(ConfigError::UnsafeName(camera.name.clone()));
            }
            if camera.clock_offset > max_offset || camera.clock_offset < -max_offset {
                return Err(ConfigError::OffsetOutOfRange {
                    name: camera.name.clone(),
                    max_ms: MAX_CLOCK_OFFSET_MS,
                });
            }
            if camera.start > camera.end {
                return Err(ConfigError::InvertedWindow {
                    name: camera.name.clone(),
                });
            }
            if !names.insert(camera.name.as_str()) {
                return Err(ConfigError::DuplicateName(camera.name.clone()));
            }
        }

        Ok(Self { cameras })
    }

    pub fn from_entries(
        entries: Vec<CameraEntry>,
        now: DateTime<Utc>,
        default_offset: TimeDelta,
    ) -> Result<Self, ConfigError> {
        let cameras = entries
            .into_iter()
            .map(|entry| -> Result<Camera, ConfigError> {
                let offset = match entry.clock_offset_ms {
                    Some(millis) => clock_offset_from_millis(millis).ok_or_else(|| {
                        ConfigError::OffsetOutOfRange {
                            name: entry.name.clone(),
                            max_ms: MAX_CLOCK_OFFSET_MS,
                        }
                    })?,
                    None => default_offset,
                };
                Ok(
                    Camera::new(entry.name, entry.id, entry.start, entry.end.unwrap_or(now))
                        .with_clock_offset(offset),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(cameras)
    }

    pub fn from_json(
        json: &str,
        now: DateTime<Utc>,
        default_offset: TimeDelta,
    ) -> Result<Self, ConfigError> {
        let entries: Vec<CameraEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, now, default_offset)
    }

    /// Read and validate the registry file at `path`.
    pub fn load(
        path: &Path,
        now: DateTime<Utc>,
        default_offset: TimeDelta,
    ) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::CameraFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, now, default_offset)
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// Where the timeline walk begins.
    pub fn earliest_start(&self) -> DateTime<Utc> {
        self.cameras
            .iter()
            .map(Camera::start)
            .min()
            .unwrap_or_else(Utc::now)
    }
}

// A name becomes a directory under the output root, so it must be exactly one
// plain path component.
fn name_is_valid(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let camera = Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9));
        assert!(camera.is_active_at(at(4, 25, 8)));
        assert!(camera.is_active_at(at(4, 25, 9)));
        assert!(!camera.is_active_at(at(4, 25, 7)));
        assert!(!camera.is_active_at(at(4, 25, 10)));
    }

    #[test]
    fn test_directory_is_named_after_camera() {
        let camera = Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9));
        assert_eq!(
            camera.directory(Path::new("protect-archive")),
            PathBuf::from("protect-archive/Camera1")
        );
    }

    #[test]
    fn test_rejects_inverted_window() {
        let result = CameraRegistry::new(vec![Camera::new("Camera1", "abc", at(4, 25, 9), at(4, 25, 8))]);
        assert!(matches!(result, Err(ConfigError::InvertedWindow { .. })));
    }

    #[test]
    fn test_accepts_single_instant_window() {
        let registry = CameraRegistry::new(vec![Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 8))]);
        assert!(registry.is_ok());
    }

    #[test]
    fn test_rejects_empty_fields() {
        let no_name = CameraRegistry::new(vec![Camera::new(" ", "abc", at(4, 25, 8), at(4, 25, 9))]);
        assert!(matches!(
            no_name,
            Err(ConfigError::EmptyField { index: 0, field: "name" })
        ));

        let no_id = CameraRegistry::new(vec![
            Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9)),
            Camera::new("Camera2", "", at(4, 25, 8), at(4, 25, 9)),
        ]);
        assert!(matches!(
            no_id,
            Err(ConfigError::EmptyField { index: 1, field: "id" })
        ));
    }

    #[test]
    fn test_rejects_duplicate_and_unsafe_names() {
        let duplicate = CameraRegistry::new(vec![
            Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9)),
            Camera::new("Camera1", "def", at(4, 25, 8), at(4, 25, 9)),
        ]);
        assert!(matches!(duplicate, Err(ConfigError::DuplicateName(_))));

        for name in ["..", "a/b", "/root", "a\\b", "."] {
            let result = CameraRegistry::new(vec![Camera::new(name, "abc", at(4, 25, 8), at(4, 25, 9))]);
            assert!(
                matches!(result, Err(ConfigError::UnsafeName(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_empty_registry() {
        assert!(matches!(
            CameraRegistry::new(vec![]),
            Err(ConfigError::NoCameras)
        ));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let now = at(7, 8, 10);
        let json = r#"[
            {"name": "Camera1", "id": "CAMERA1_ID", "start": "2021-04-25T08:00:00Z"},
            {"name": "Camera2", "id": "CAMERA2_ID", "start": "2021-03-16T08:00:00Z",
             "end": "2021-06-01T00:00:00Z", "clock_offset_ms": -1500}
        ]"#;

        let registry = CameraRegistry::from_json(json, now, TimeDelta::seconds(5)).unwrap();
        let cameras = registry.cameras();

        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].name(), "Camera1");
        assert_eq!(cameras[0].id(), "CAMERA1_ID");
        assert_eq!(cameras[0].end(), now);
        assert_eq!(cameras[0].clock_offset(), TimeDelta::milliseconds(5000));
        assert_eq!(cameras[1].end(), Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(cameras[1].clock_offset(), TimeDelta::milliseconds(-1500));
        assert_eq!(registry.earliest_start(), at(3, 16, 8));
    }

    #[test]
    fn test_from_json_converts_offsets_to_utc() {
        let json = r#"[{"name": "Camera1", "id": "x", "start": "2021-04-25T08:00:00-07:00"}]"#;
        let registry = CameraRegistry::from_json(json, at(7, 8, 10), TimeDelta::zero()).unwrap();
        assert_eq!(registry.cameras()[0].start(), at(4, 25, 15));
    }

    #[test]
    fn test_rejects_offsets_beyond_one_day() {
        let too_far = Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9))
            .with_clock_offset(TimeDelta::MAX);
        assert!(matches!(
            CameraRegistry::new(vec![too_far]),
            Err(ConfigError::OffsetOutOfRange { .. })
        ));

        let edge = Camera::new("Camera1", "abc", at(4, 25, 8), at(4, 25, 9))
            .with_clock_offset(TimeDelta::milliseconds(-MAX_CLOCK_OFFSET_MS));
        assert!(CameraRegistry::new(vec![edge]).is_ok());
    }

    #[test]
    fn test_from_json_rejects_extreme_offsets_without_panicking() {
        for millis in [i64::MAX, i64::MIN, MAX_CLOCK_OFFSET_MS + 1] {
            let json = format!(
                r#"[{{"name": "Camera1", "id": "x", "start": "2021-04-25T08:00:00Z", "clock_offset_ms": {millis}}}]"#
            );
            let result = CameraRegistry::from_json(&json, at(7, 8, 10), TimeDelta::zero());
            assert!(
                matches!(result, Err(ConfigError::OffsetOutOfRange { ref name, .. }) if name == "Camera1"),
                "{millis} should be rejected"
            );
        }
    }

    #[test]
    fn test_clock_offset_from_millis_bounds() {
        assert_eq!(clock_offset_from_millis(0), Some(TimeDelta::zero()));
        assert_eq!(
            clock_offset_from_millis(MAX_CLOCK_OFFSET_MS),
            Some(TimeDelta::days(1))
        );
        assert_eq!(clock_offset_from_millis(MAX_CLOCK_OFFSET_MS + 1), None);
        assert_eq!(clock_offset_from_millis(i64::MIN), None);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = CameraRegistry::from_json("{not json", at(7, 8, 10), TimeDelta::zero());
        assert!(matches!(result, Err(ConfigError::CameraFormat(_))));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let result = CameraRegistry::load(
            Path::new("does/not/exist.json"),
            at(7, 8, 10),
            TimeDelta::zero(),
        );
        assert!(matches!(result, Err(ConfigError::CameraFile { .. })));
    }
}
