//! Configuration loaded from the environment (and `.env`).

use crate::adapters::protect::ProtectSettings;
use crate::application::RetryPolicy;
use crate::domain::timeline::DEFAULT_INTERVAL_SECS;
use crate::domain::{clock_offset_from_millis, MAX_CLOCK_OFFSET_MS};
use crate::error::ConfigError;
use chrono::{DateTime, TimeDelta, Utc};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a timeline capture run.
#[derive(Clone, Debug)]
pub struct TimelapseConfig {
    /// Console address and credentials
    pub protect: ProtectSettings,
    /// JSON camera registry
    pub cameras_file: PathBuf,
    /// Artifact root
    pub output_dir: PathBuf,
    /// Spacing between ticks
    pub interval: TimeDelta,
    /// Offset for cameras that don't declare their own
    pub clock_offset: TimeDelta,
    /// Frame tool executable
    pub ffmpeg_path: PathBuf,
    /// Upper bound on one frame extraction
    pub ffmpeg_timeout: Duration,
    /// In-run retries after a session failure
    pub retry: RetryPolicy,
}

impl TimelapseConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let interval_secs: i64 = parse_or(&lookup, "INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        if interval_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "INTERVAL_SECS",
                reason: "must be positive".to_string(),
            });
        }
        let interval = TimeDelta::try_seconds(interval_secs).ok_or_else(|| ConfigError::Invalid {
            name: "INTERVAL_SECS",
            reason: "out of range".to_string(),
        })?;

        Ok(Self {
            protect: protect_settings(&lookup)?,
            cameras_file: PathBuf::from(
                lookup("CAMERAS_FILE").unwrap_or_else(|| String::from("cameras.json")),
            ),
            output_dir: PathBuf::from(
                lookup("OUTPUT_DIR").unwrap_or_else(|| String::from("protect-archive")),
            ),
            interval,
            clock_offset: clock_offset(&lookup)?,
            ffmpeg_path: PathBuf::from(
                lookup("FFMPEG_PATH").unwrap_or_else(|| String::from("ffmpeg")),
            ),
            ffmpeg_timeout: Duration::from_secs(parse_or(&lookup, "FFMPEG_TIMEOUT_SECS", 30)?),
            retry: RetryPolicy {
                max_session_retries: parse_or(&lookup, "SESSION_RETRIES", 0)?,
                backoff: Duration::from_secs(parse_or(
                    &lookup,
                    "SESSION_RETRY_BACKOFF_SECS",
                    5,
                )?),
            },
        })
    }
}

/// Configuration for the one-off `export` binary.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub protect: ProtectSettings,
    pub camera_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub clock_offset: TimeDelta,
    pub output: PathBuf,
    /// Extract a still instead of saving the clip
    pub snapshot: bool,
    pub ffmpeg_path: PathBuf,
    pub ffmpeg_timeout: Duration,
}

impl ExportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let start: DateTime<Utc> = parse_required(&lookup, "EXPORT_START")?;
        let end: DateTime<Utc> = parse_or(&lookup, "EXPORT_END", start)?;
        if start > end {
            return Err(ConfigError::Invalid {
                name: "EXPORT_END",
                reason: "must not be before EXPORT_START".to_string(),
            });
        }

        Ok(Self {
            protect: protect_settings(&lookup)?,
            camera_id: required(&lookup, "EXPORT_CAMERA_ID")?,
            start,
            end,
            clock_offset: clock_offset(&lookup)?,
            output: PathBuf::from(required(&lookup, "EXPORT_OUTPUT")?),
            snapshot: parse_or(&lookup, "EXPORT_SNAPSHOT", false)?,
            ffmpeg_path: PathBuf::from(
                lookup("FFMPEG_PATH").unwrap_or_else(|| String::from("ffmpeg")),
            ),
            ffmpeg_timeout: Duration::from_secs(parse_or(&lookup, "FFMPEG_TIMEOUT_SECS", 30)?),
        })
    }
}

fn protect_settings<L>(lookup: &L) -> Result<ProtectSettings, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let mut settings = ProtectSettings::new(
        &required(lookup, "PROTECT_SERVER")?,
        &required(lookup, "PROTECT_USERNAME")?,
        &required(lookup, "PROTECT_PASSWORD")?,
    );
    settings.request_timeout = Duration::from_secs(parse_or(lookup, "REQUEST_TIMEOUT_SECS", 60)?);
    settings.accept_invalid_certs = parse_or(lookup, "PROTECT_ACCEPT_INVALID_CERTS", true)?;
    Ok(settings)
}

fn clock_offset<L>(lookup: &L) -> Result<TimeDelta, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let millis: i64 = parse_or(lookup, "CLOCK_OFFSET_MS", 0)?;
    clock_offset_from_millis(millis).ok_or_else(|| ConfigError::Invalid {
        name: "CLOCK_OFFSET_MS",
        reason: format!("must be within ±{} ms", MAX_CLOCK_OFFSET_MS),
    })
}

fn required<L>(lookup: &L, name: &'static str) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_required<L, T>(lookup: &L, name: &'static str) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse(name, &required(lookup, name)?)
}

fn parse_or<L, T>(lookup: &L, name: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => parse(name, &value),
        None => Ok(default),
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("PROTECT_SERVER", "192.168.1.1"),
        ("PROTECT_USERNAME", "operator"),
        ("PROTECT_PASSWORD", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = TimelapseConfig::from_lookup(lookup(&CREDENTIALS)).unwrap();

        assert_eq!(config.protect.base_url, "https://192.168.1.1");
        assert_eq!(config.protect.request_timeout, Duration::from_secs(60));
        assert!(config.protect.accept_invalid_certs);
        assert_eq!(config.cameras_file, PathBuf::from("cameras.json"));
        assert_eq!(config.output_dir, PathBuf::from("protect-archive"));
        assert_eq!(config.interval, TimeDelta::minutes(1));
        assert_eq!(config.clock_offset, TimeDelta::zero());
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("INTERVAL_SECS", "300"),
            ("CLOCK_OFFSET_MS", "-5000"),
            ("FFMPEG_PATH", "/usr/local/bin/ffmpeg"),
            ("SESSION_RETRIES", "2"),
            ("SESSION_RETRY_BACKOFF_SECS", "1"),
            ("PROTECT_ACCEPT_INVALID_CERTS", "false"),
        ]);

        let config = TimelapseConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.interval, TimeDelta::minutes(5));
        assert_eq!(config.clock_offset, TimeDelta::milliseconds(-5000));
        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.retry.max_session_retries, 2);
        assert_eq!(config.retry.backoff, Duration::from_secs(1));
        assert!(!config.protect.accept_invalid_certs);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let result = TimelapseConfig::from_lookup(lookup(&CREDENTIALS[..2]));
        assert!(matches!(
            result,
            Err(ConfigError::Missing("PROTECT_PASSWORD"))
        ));

        let mut vars = CREDENTIALS.to_vec();
        vars[0] = ("PROTECT_SERVER", "  ");
        let result = TimelapseConfig::from_lookup(lookup(&vars));
        assert!(matches!(result, Err(ConfigError::Missing("PROTECT_SERVER"))));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("INTERVAL_SECS", "0"));
        assert!(matches!(
            TimelapseConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "INTERVAL_SECS", .. })
        ));

        let mut vars = CREDENTIALS.to_vec();
        vars.push(("CLOCK_OFFSET_MS", "five seconds"));
        assert!(matches!(
            TimelapseConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "CLOCK_OFFSET_MS", .. })
        ));
    }

    #[test]
    fn test_extreme_numbers_are_config_errors() {
        for (name, value) in [
            ("INTERVAL_SECS", "9223372036854775807"),
            ("CLOCK_OFFSET_MS", "-9223372036854775808"),
            ("CLOCK_OFFSET_MS", "9223372036854775807"),
            ("CLOCK_OFFSET_MS", "86400001"),
        ] {
            let mut vars = CREDENTIALS.to_vec();
            vars.push((name, value));
            let result = TimelapseConfig::from_lookup(lookup(&vars));
            assert!(
                matches!(result, Err(ConfigError::Invalid { name: n, .. }) if n == name),
                "{name}={value} should be rejected"
            );
        }

        let mut vars = CREDENTIALS.to_vec();
        vars.extend([("INTERVAL_SECS", "86400"), ("CLOCK_OFFSET_MS", "-86400000")]);
        let config = TimelapseConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.interval, TimeDelta::days(1));
        assert_eq!(config.clock_offset, TimeDelta::days(-1));
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let config = TimelapseConfig::from_lookup(lookup(&CREDENTIALS)).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("secret"), "{debug}");
        assert!(debug.contains("operator"));
        assert!(debug.contains("192.168.1.1"));
    }

    #[test]
    fn test_export_config() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("EXPORT_CAMERA_ID", "PROTECT_CAMERA"),
            ("EXPORT_START", "2021-07-08T10:00:00Z"),
            ("EXPORT_END", "2021-07-08T10:00:01Z"),
            ("EXPORT_OUTPUT", "sample-video.mp4"),
            ("CLOCK_OFFSET_MS", "5000"),
        ]);

        let config = ExportConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.camera_id, "PROTECT_CAMERA");
        assert_eq!(config.start, Utc.with_ymd_and_hms(2021, 7, 8, 10, 0, 0).unwrap());
        assert_eq!(config.end, Utc.with_ymd_and_hms(2021, 7, 8, 10, 0, 1).unwrap());
        assert_eq!(config.clock_offset, TimeDelta::seconds(5));
        assert!(!config.snapshot);
    }

    #[test]
    fn test_export_end_defaults_to_start_and_must_follow_it() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("EXPORT_CAMERA_ID", "PROTECT_CAMERA"),
            ("EXPORT_START", "2021-07-08T10:00:00Z"),
            ("EXPORT_OUTPUT", "sample-snapshot.jpg"),
            ("EXPORT_SNAPSHOT", "true"),
        ]);
        let config = ExportConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.start, config.end);
        assert!(config.snapshot);

        vars.push(("EXPORT_END", "2021-07-08T09:00:00Z"));
        assert!(matches!(
            ExportConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "EXPORT_END", .. })
        ));
    }
}
