//! Export Binary - saves one clip or one still for a single camera.

use protect_timelapse::adapters::local::FfmpegExtractor;
use protect_timelapse::adapters::protect::ProtectConnector;
use protect_timelapse::application::export::{export_clip, export_snapshot};
use protect_timelapse::ports::Session;
use protect_timelapse::{logging, Camera, ExportConfig};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match ExportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let camera = Camera::new(&config.camera_id, &config.camera_id, config.start, config.end)
        .with_clock_offset(config.clock_offset);

    let session = match ProtectConnector::new(config.protect.clone()).login().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            std::process::exit(1);
        }
    };

    let result = if config.snapshot {
        let extractor = FfmpegExtractor::new(&config.ffmpeg_path, config.ffmpeg_timeout);
        export_snapshot(&session, &extractor, &camera, config.start, &config.output).await
    } else {
        export_clip(&session, &camera, config.start, config.end, &config.output)
            .await
            .map(|_| ())
    };

    session.close().await;

    if let Err(e) = result {
        tracing::error!(error = %e, "export failed");
        std::process::exit(1);
    }
}
