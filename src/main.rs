use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camserve::state::AppState;
use camserve::video::{CaptureConfig, Resolution};
use camserve::web;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// camserve command line arguments
#[derive(Parser, Debug)]
#[command(name = "camserve")]
#[command(version, about = "Webcam MJPEG streaming server", long_about = None)]
struct CliArgs {
    /// Listen address
    #[arg(short = 'a', long, value_name = "ADDRESS", default_value = "127.0.0.1")]
    address: String,

    /// HTTP port
    #[arg(short = 'p', long, value_name = "PORT", default_value_t = 8000)]
    port: u16,

    /// Capture device index (/dev/video<N>)
    #[arg(short = 'd', long, value_name = "INDEX", default_value_t = 0)]
    device: usize,

    /// Capture resolution (WIDTHxHEIGHT)
    #[arg(short = 'r', long, value_name = "RES", default_value = "640x480")]
    resolution: String,

    /// Desired frame rate (0 = driver default)
    #[arg(long, value_name = "FPS", default_value_t = 30)]
    fps: u32,

    /// JPEG quality (1-100) for re-encoded raw frames
    #[arg(short = 'q', long, value_name = "QUALITY", default_value_t = 80)]
    quality: u8,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level);

    tracing::info!("Starting camserve v{}", env!("CARGO_PKG_VERSION"));

    let resolution: Resolution = args
        .resolution
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid resolution: {}", e))?;

    let capture = CaptureConfig {
        device_index: args.device,
        resolution,
        fps: args.fps,
        jpeg_quality: args.quality.clamp(1, 100),
    };
    tracing::info!(
        "Capture config: /dev/video{} {} @ {} fps, quality {}",
        capture.device_index,
        capture.resolution,
        capture.fps,
        capture.jpeg_quality
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(capture, shutdown.clone());
    let app = web::create_router(state);

    let addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid bind address: {}:{}", args.address, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            // Active stream sessions observe this and release their devices
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel) {
    let filter = match level {
        LogLevel::Error => "camserve=error,tower_http=error",
        LogLevel::Warn => "camserve=warn,tower_http=warn",
        LogLevel::Info => "camserve=info,tower_http=info",
        LogLevel::Debug => "camserve=debug,tower_http=debug",
        LogLevel::Trace => "camserve=trace,tower_http=debug",
    };

    // Environment variable takes highest priority
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

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
