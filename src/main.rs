//! Timelapse Binary - walks every configured camera's window once and exits.

use chrono::Utc;
use protect_timelapse::adapters::local::FfmpegExtractor;
use protect_timelapse::adapters::protect::ProtectConnector;
use protect_timelapse::{logging, CameraRegistry, CaptureOrchestrator, TimelapseConfig};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match TimelapseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    // Sampled once: bounds the walk and closes open-ended camera windows.
    let now = Utc::now();

    let registry = match CameraRegistry::load(&config.cameras_file, now, config.clock_offset) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "invalid camera registry");
            std::process::exit(1);
        }
    };

    let connector = ProtectConnector::new(config.protect.clone());
    let extractor = FfmpegExtractor::new(&config.ffmpeg_path, config.ffmpeg_timeout);

    let mut orchestrator =
        CaptureOrchestrator::new(registry, &config.output_dir, connector, extractor)
            .with_interval(config.interval)
            .with_retry_policy(config.retry);

    if let Err(e) = orchestrator.prepare_directories().await {
        tracing::error!(
            error = %e,
            root = %config.output_dir.display(),
            "could not create camera directories"
        );
        std::process::exit(1);
    }

    let stats = orchestrator.run(now).await;

    tracing::info!(
        ticks = stats.ticks,
        captured = stats.captured,
        skipped = stats.skipped,
        fetch_failures = stats.fetch_failures,
        extract_failures = stats.extract_failures,
        other_failures = stats.other_failures,
        authentications = stats.authentications,
        "timeline walk finished"
    );
}
