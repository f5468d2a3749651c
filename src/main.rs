//! Camera Session CLI
//!
//! Starts a camera session, captures a few photos and writes them to
//! disk. Uses synthetic mock cameras unless built with the `camera`
//! feature and run with `--native`.

use camera_session::{
    capture::{
        CapabilityProvider, FacingMode, FileConfig, FocusMode, MockDevice, MockProvider,
        VideoStream,
    },
    filter::FilterKind,
    metrics::MetricsSnapshot,
    pipeline::{ImageFormat, LayoutSnapshot},
    session::{CameraSession, SessionState},
};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-session", version, about = "Camera session capture demo")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Facing mode to start with (user, environment)
    #[arg(long)]
    facing: Option<FacingMode>,

    /// Filter applied to captures (none, sharpen)
    #[arg(long)]
    filter: Option<FilterKind>,

    /// Output MIME type (image/jpeg, image/png, image/webp)
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Number of photos to take
    #[arg(short = 'n', long, default_value_t = 3)]
    photos: u32,

    /// Displayed container size, e.g. 300x300
    #[arg(long, value_parser = parse_size)]
    container: Option<(f64, f64)>,

    /// Directory the photos are written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Use the platform camera instead of mock devices
    #[cfg(feature = "camera")]
    #[arg(long)]
    native: bool,
}

fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let w: f64 = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let h: f64 = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Ok((w, h))
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Camera Session v{}", camera_session::VERSION);

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(facing) = args.facing {
        config.session.facing_mode = facing;
    }
    if let Some(filter) = args.filter {
        config.session.capture.filter = filter;
    }
    if let Some(format) = args.format {
        config.session.capture.format = format;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&runtime, run_selected(&args, config, &interrupted));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "camera")]
async fn run_selected(
    args: &Args,
    config: FileConfig,
    interrupted: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    if args.native {
        let provider = camera_session::capture::NativeProvider::new();
        run(provider, args, config, interrupted).await
    } else {
        run(demo_provider(), args, config, interrupted).await
    }
}

#[cfg(not(feature = "camera"))]
async fn run_selected(
    args: &Args,
    config: FileConfig,
    interrupted: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    run(demo_provider(), args, config, interrupted).await
}

fn demo_provider() -> MockProvider {
    MockProvider::with_devices(vec![
        MockDevice::new("front", FacingMode::User, &[FocusMode::Continuous]),
        MockDevice::new("rear-wide", FacingMode::Environment, &[FocusMode::Manual]),
        MockDevice::new(
            "rear-main",
            FacingMode::Environment,
            &[FocusMode::SingleShot, FocusMode::Continuous],
        ),
    ])
}

async fn run<P: CapabilityProvider>(
    provider: P,
    args: &Args,
    config: FileConfig,
    interrupted: &AtomicBool,
) -> Result<(), Box<dyn Error>> {
    let exporter = Exporter::start(config.metrics.port)?;

    let mut session = CameraSession::new(provider, config.session)?;
    session.on_devices_changed(|devices| info!(count = devices.len(), "Devices enumerated"));
    session.on_acquisition_failed(|e| warn!("Camera unavailable: {}", e));

    let state = session.settle().await;
    if state != SessionState::Started {
        return Err(match session.last_error() {
            Some(e) => format!("camera did not start: {e}").into(),
            None => format!("camera did not start (state {state})").into(),
        });
    }
    if let Some(stream) = session.stream() {
        info!(device_id = %stream.device_id(), "Using camera");
    }
    info!("Track settings:\n{}", session.settings_json()?);

    let layout = match args.container {
        Some((width, height)) => LayoutSnapshot::container(width, height),
        None => LayoutSnapshot::default(),
    };

    std::fs::create_dir_all(&args.output)?;
    for i in 0..args.photos {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, stopping early");
            break;
        }

        let photo = session.take_photo(&layout)?;
        let path = args
            .output
            .join(format!("{:02}_{}", i + 1, photo.suggested_file_name()));
        std::fs::write(&path, &photo.data)?;
        info!(
            path = %path.display(),
            width = photo.width,
            height = photo.height,
            bytes = photo.data.len(),
            "Photo saved"
        );

        exporter.publish(MetricsSnapshot::from_session(&session)).await;
    }

    session.stop();
    session.settle().await;

    let snapshot = MetricsSnapshot::from_session(&session);
    info!(
        acquisitions = snapshot.acquisitions,
        auto_switches = snapshot.auto_switches,
        photos = snapshot.photos,
        "Done"
    );
    Ok(())
}

/// Pushes session snapshots to the metrics server, when there is one.
struct Exporter {
    #[cfg(feature = "metrics")]
    state: Option<Arc<tokio::sync::RwLock<camera_session::metrics::MetricsState>>>,
}

impl Exporter {
    #[cfg(feature = "metrics")]
    fn start(port: u16) -> Result<Self, Box<dyn Error>> {
        use camera_session::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

        if port == 0 {
            return Ok(Self { state: None });
        }
        let server =
            MetricsServer::new(MetricsServerConfig::with_port(port), MetricsRegistry::new()?);
        let state = server.state();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                warn!("Metrics server stopped: {}", e);
            }
        });
        Ok(Self { state: Some(state) })
    }

    #[cfg(not(feature = "metrics"))]
    fn start(port: u16) -> Result<Self, Box<dyn Error>> {
        if port != 0 {
            info!("Built without the metrics feature, exporter disabled");
        }
        Ok(Self {})
    }

    #[cfg(feature = "metrics")]
    async fn publish(&self, snapshot: MetricsSnapshot) {
        if let Some(state) = &self.state {
            state.write().await.update(snapshot);
        }
    }

    #[cfg(not(feature = "metrics"))]
    async fn publish(&self, _snapshot: MetricsSnapshot) {}
}
