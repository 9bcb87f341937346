//! Stick Frames – terminal front end for the landmark pipeline.
//!
//! This binary:
//! 1. Reads configuration from `stickframes.conf` (defaults if absent)
//! 2. Probes the processing backend once
//! 3. Uploads a video file or records one from the webcam
//! 4. Saves the three landmark streams into `OUTPUT_DIR`

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use stickframes_capture::backend::{Backend, HttpBackend};
use stickframes_capture::camera::FfmpegCamera;
use stickframes_capture::object_url::ObjectUrls;
use stickframes_capture::orchestrator::{Delivery, Orchestrator};
use stickframes_capture::recording::CameraSection;
use stickframes_capture::sink::LandmarkBoard;
use stickframes_capture::status::{self, ServerStatus};
use stickframes_capture::upload::UploadSection;
use stickframes_common::config::{self, Config};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const USAGE: &str = "usage: stickframes probe [CONFIG]
       stickframes upload <VIDEO> [CONFIG]
       stickframes record <SECONDS> [CONFIG]";

#[derive(Debug, PartialEq)]
enum Command {
    Probe,
    Upload(PathBuf),
    Record(Duration),
}

#[derive(Debug, PartialEq)]
struct Invocation {
    command: Command,
    config_path: PathBuf,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Invocation> {
    let mut args = args.into_iter();
    let command = match args.next().as_deref() {
        Some("probe") => Command::Probe,
        Some("upload") => {
            let path = args.next().context("upload needs a video path")?;
            Command::Upload(PathBuf::from(path))
        }
        Some("record") => {
            let secs: f64 = args
                .next()
                .context("record needs a duration in seconds")?
                .parse()
                .context("duration must be a number of seconds")?;
            let Ok(duration) = Duration::try_from_secs_f64(secs) else {
                bail!("duration must be a non-negative number of seconds");
            };
            Command::Record(duration)
        }
        Some(other) => bail!("unknown command `{other}`\n{USAGE}"),
        None => bail!("{USAGE}"),
    };

    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(Config::default_path()));
    if let Some(extra) = args.next() {
        bail!("unexpected argument `{extra}`\n{USAGE}");
    }

    Ok(Invocation {
        command,
        config_path,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let invocation = parse_args(std::env::args().skip(1))?;
    let config = config::load_or_default(&invocation.config_path).context("Config load failed")?;

    info!("Stick Frames starting (api_root={})", config.api_root);

    // ── ctrl-c ───────────────────────────────────────────────────────
    ctrlc::set_handler(move || {
        if SHUTDOWN.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        info!("Shutdown signal received");
    })
    .context("Cannot set Ctrl-C handler")?;

    let local = tokio::task::LocalSet::new();
    local.run_until(run(invocation.command, config)).await
}

async fn run(command: Command, config: Config) -> Result<()> {
    let backend: Rc<dyn Backend> = Rc::new(HttpBackend::new(&config)?);

    // ── availability probe ───────────────────────────────────────────
    let mut server = status::spawn_probe(backend.clone());
    let server_status = server.resolved().await;

    let board = Rc::new(LandmarkBoard::new());
    let orchestrator = Rc::new(Orchestrator::new(backend, board.clone()));

    let delivery = match command {
        Command::Probe => {
            println!("Backend at {} is {server_status}", config.api_root);
            if server_status != ServerStatus::Running {
                bail!("backend unreachable");
            }
            return Ok(());
        }
        Command::Upload(path) => {
            let section =
                UploadSection::new(orchestrator, server.clone(), config.max_upload_bytes());
            section.select_file(&path).await?
        }
        Command::Record(duration) => {
            let camera = Rc::new(FfmpegCamera::from_config(&config));
            let section = CameraSection::new(
                camera,
                orchestrator,
                server.clone(),
                ObjectUrls::new(),
                &config.recording_mime,
            );
            let delivery = record_and_process(&section, duration).await;
            section.teardown();
            delivery?
        }
    };

    match delivery {
        Delivery::Delivered(_) => {
            for path in board.export_all(&config.output_dir)? {
                println!("{}", path.display());
            }
        }
        Delivery::Discarded => warn!("Result discarded"),
    }
    Ok(())
}

async fn record_and_process(section: &CameraSection, duration: Duration) -> Result<Delivery> {
    section.start_recording().await?;
    info!("Recording for {:.1}s (Ctrl-C stops early)", duration.as_secs_f64());

    // Poll so Ctrl-C can end the recording early and still upload it.
    let started = Instant::now();
    while started.elapsed() < duration && !SHUTDOWN.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    section.stop_recording().await?;
    if let Some(preview) = section.preview() {
        info!("Recording ready ({preview})");
    }
    Ok(section.process().await?)
}
