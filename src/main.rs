use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cat_cam::config::{AppConfig, RecordingCodec};
use cat_cam::recording::{DailyScheduler, FfmpegSinkFactory, RecordingJob, SystemClock};
use cat_cam::state::AppState;
use cat_cam::utils::{bind_tcp_listener, resolve_bind_addr};
use cat_cam::video::V4l2Camera;
use cat_cam::web;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// Codec choices on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecArg {
    H264,
    Mjpeg,
}

impl From<CodecArg> for RecordingCodec {
    fn from(codec: CodecArg) -> Self {
        match codec {
            CodecArg::H264 => RecordingCodec::H264,
            CodecArg::Mjpeg => RecordingCodec::Mjpeg,
        }
    }
}

/// Cat Cam command line arguments
#[derive(Parser, Debug)]
#[command(name = "cat-cam")]
#[command(version, about = "Home camera server with scheduled recordings and a live view", long_about = None)]
struct CliArgs {
    /// Listen address
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// HTTP port
    #[arg(short = 'p', long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Directory recordings are written to and served from
    #[arg(short = 'd', long, value_name = "DIR")]
    recordings_dir: Option<PathBuf>,

    /// Camera index (/dev/video<INDEX>)
    #[arg(short = 'c', long, value_name = "INDEX")]
    camera: Option<usize>,

    /// Length of each scheduled recording in seconds
    #[arg(long, value_name = "SECS")]
    record_secs: Option<u64>,

    /// Codec for recorded clips
    #[arg(long, value_name = "CODEC")]
    codec: Option<CodecArg>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    let config = build_config(&args);
    config.validate()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!("Starting Cat Cam v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.recording.dir).await?;
    tracing::info!("Recordings directory: {}", config.recording.dir.display());

    let camera = Arc::new(V4l2Camera::new(&config.camera));
    let clock = Arc::new(SystemClock::new());

    // Recording and preview each open the camera on their own
    let job = RecordingJob::new(
        &config,
        camera.clone(),
        Arc::new(FfmpegSinkFactory::new()),
        clock.clone(),
    );
    let scheduler = DailyScheduler::new(&config.recording, Arc::new(job), clock);
    let schedule: Vec<String> = config
        .recording
        .schedule
        .iter()
        .map(|entry| entry.to_string())
        .collect();
    tracing::info!(
        "Recording {}s clips daily at {}",
        config.recording.duration_secs,
        schedule.join(", ")
    );
    let scheduler_task = scheduler.spawn();

    let addr = resolve_bind_addr(&config.web.bind_address, config.web.http_port)?;
    let state = AppState::new(&config, camera);
    let app = web::create_router(state);

    let listener = bind_tcp_listener(addr)?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);
    let listener = tokio::net::TcpListener::from_std(listener)?;

    tokio::select! {
        _ = shutdown_signal() => {}
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
            }
        }
    }

    scheduler_task.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

fn build_config(args: &CliArgs) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(addr) = &args.address {
        config.web.bind_address = addr.clone();
    }
    if let Some(port) = args.http_port {
        config.web.http_port = port;
    }
    if let Some(dir) = &args.recordings_dir {
        config.recording.dir = dir.clone();
    }
    if let Some(index) = args.camera {
        config.camera.index = index;
    }
    if let Some(secs) = args.record_secs {
        config.recording.duration_secs = secs;
    }
    if let Some(codec) = args.codec {
        config.recording.codec = codec.into();
    }

    config
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Initialize logging with log level and verbosity
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "cat_cam=error,tower_http=error",
        LogLevel::Warn => "cat_cam=warn,tower_http=warn",
        LogLevel::Info => "cat_cam=info,tower_http=info",
        LogLevel::Verbose => "cat_cam=debug,tower_http=info",
        LogLevel::Debug => "cat_cam=debug,tower_http=debug",
        LogLevel::Trace => "cat_cam=trace,tower_http=debug",
    };

    // RUST_LOG takes priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::parse_from([
            "cat-cam",
            "-p",
            "8080",
            "-d",
            "/var/lib/cat-cam",
            "-c",
            "0",
            "--codec",
            "mjpeg",
        ]);
        let config = build_config(&args);
        assert_eq!(config.web.http_port, 8080);
        assert_eq!(config.recording.dir, PathBuf::from("/var/lib/cat-cam"));
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.recording.codec, RecordingCodec::Mjpeg);
        assert_eq!(config.recording.duration_secs, 240);
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = build_config(&CliArgs::parse_from(["cat-cam"]));
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert_eq!(config.web.http_port, 5000);
        assert!(config.validate().is_ok());
    }
}
