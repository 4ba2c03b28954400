mod app;
mod ui;

use app::{App, status_handler};
use clap::{ArgAction, Parser};
use common::Status;
use lumacam::media::native::{self, NativeDevices};
use lumacam::{CaptureConfig, CaptureController, OverlapPolicy};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

/// Camera preview with a guide ring and a running brightness estimate
///
/// To try it against the default camera:
///
/// ```bash
/// cargo run --bin lumacam
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Camera id to open (see --list-devices), default camera otherwise
    #[arg(short, long)]
    device: Option<String>,

    /// Minimum time between brightness samples, in milliseconds
    #[arg(short, long, default_value_t = 400)]
    interval_ms: u64,

    /// Frame loop rate
    #[arg(long, default_value_t = CaptureConfig::DEFAULT_REFRESH_HZ)]
    refresh_hz: u32,

    /// Directory snapshots are written to
    #[arg(short, long, default_value = ".")]
    snapshot_dir: PathBuf,

    /// Let slow sample handlers overlap instead of dropping samples
    #[arg(long, action = ArgAction::SetTrue)]
    allow_overlap: bool,

    /// Print the available cameras and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_devices: bool,

    /// No terminal UI: print a status line per sample until Ctrl-C
    #[arg(long, action = ArgAction::SetTrue)]
    headless: bool,

    /// Log file path
    #[arg(short, long, default_value = "lumacam.log")]
    log_file: PathBuf,

    /// Enable verbose output
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device_id: self.device.clone(),
            sample_interval: Duration::from_millis(self.interval_ms),
            refresh_hz: self.refresh_hz,
            snapshot_dir: self.snapshot_dir.clone(),
            overlap: if self.allow_overlap {
                OverlapPolicy::Allow
            } else {
                OverlapPolicy::SkipWhileBusy
            },
            ..Default::default()
        }
    }
}

/// Logs go to a file so they do not tear up the terminal UI
fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    Ok(())
}

/// Entry point for the lumacam camera guide
///
/// Opens a camera, draws a guide ring over the preview and samples the
/// center of the frame for a brightness estimate, either in a terminal UI
/// or, with `--headless`, as plain status lines
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.capture_config();
    let controller = CaptureController::new(NativeDevices::new(), config);

    if args.list_devices {
        for device in controller.list_devices().await {
            println!("{}\t{}", device.id, device.label);
        }
        return Ok(());
    }

    if !native::is_supported() {
        eprintln!("{}", Status::unsupported());
        return Err(Status::unsupported().message.into());
    }

    if args.headless {
        return run_headless(controller).await;
    }

    let mut app = App::new();
    app.set_devices(controller.list_devices().await);
    if let Some(id) = controller.config().device_id.clone() {
        app.request_device(&id);
    }

    ui::run_ui(controller, app).await
}

/// Start the configured camera and print every status until Ctrl-C
async fn run_headless(
    mut controller: CaptureController<NativeDevices>,
) -> Result<(), Box<dyn Error>> {
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<Status>();
    let handler = status_handler(status_tx, controller.config().low_light_threshold);
    let device = controller.config().device_id.clone();
    let interval = controller.config().sample_interval;

    if let Err(e) = controller.start(device.as_deref(), handler, interval).await {
        eprintln!("{}", Status::start_failed(&e));
        return Err(e.into());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(status) = status_rx.recv() => println!("{}", status),
        }
    }

    controller.stop().await;
    println!("{}", Status::stopped());
    Ok(())
}
