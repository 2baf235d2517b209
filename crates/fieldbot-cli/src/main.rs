//! `fieldbot` – field-robot control agent.
//!
//! Loads the configuration, opens the decision-service connection, the
//! controller link and the camera (in that order), then runs the control
//! loop until a fatal fault, `--cycles` completed cycles, or Ctrl-C.
//!
//! ```text
//! fieldbot robot.toml              # real hardware
//! fieldbot robot.json --sim        # simulated controller and camera
//! fieldbot robot.toml --cycles 20  # bench run
//! ```

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use fieldbot_hal::{ActuationChannel, Camera, CaptureDevice, SerialChannel, SimCamera, SimController};
use fieldbot_runtime::{ControlLoop, WsSession, init_tracing};
use fieldbot_types::FieldError;
use tracing::{error, info, warn};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "fieldbot", version, about = "Field-robot control agent")]
struct Cli {
    /// Configuration file (`.toml`, or `.json` for legacy settings files).
    config: PathBuf,

    /// Replace the serial controller and the camera with simulation drivers.
    #[arg(long)]
    sim: bool,

    /// Stop after this many completed cycles.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_from(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "fieldbot".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing("fieldbot", cfg.verbose);
    print_banner(&cli, &cfg);

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The loop checks the flag between cycles, so the cycle in flight
    // finishes before the process exits.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Ctrl-C received, stopping after the current cycle");
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli, &cfg, &shutdown)) {
        Ok(cycles) => {
            info!(cycles, "fieldbot stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "fieldbot stopped on error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, cfg: &Config, shutdown: &AtomicBool) -> Result<u64, FieldError> {
    let transport = WsSession::connect(&cfg.decision_url).await?;
    let channel = open_controller(cfg, cli.sim)?;
    let camera = open_camera(cfg, cli.sim)?;

    let mut control = ControlLoop::new(
        Box::new(transport),
        channel,
        CaptureDevice::new(camera),
        cfg.action_table(),
        cfg.loop_config(),
    );
    info!(
        run_id = %control.run_id(),
        actions = cfg.actions.len(),
        sim = cli.sim,
        "starting control loop"
    );
    control.run(cli.cycles, shutdown).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource acquisition
// ─────────────────────────────────────────────────────────────────────────────

fn open_controller(cfg: &Config, sim: bool) -> Result<Box<dyn ActuationChannel>, FieldError> {
    if sim {
        info!("using simulated controller");
        return Ok(Box::new(SimController::new("sim-controller")));
    }
    let channel = SerialChannel::open(&cfg.serial_device, cfg.serial_baud, cfg.serial_timeout()?)?;
    Ok(Box::new(channel))
}

#[cfg(feature = "opencv")]
fn open_camera(cfg: &Config, sim: bool) -> Result<Box<dyn Camera>, FieldError> {
    if sim {
        info!("using simulated camera");
        return Ok(Box::new(SimCamera::new("sim-camera")));
    }
    Ok(Box::new(fieldbot_hal::OpenCvCamera::open(cfg.camera_index)?))
}

#[cfg(not(feature = "opencv"))]
fn open_camera(cfg: &Config, sim: bool) -> Result<Box<dyn Camera>, FieldError> {
    if sim {
        info!("using simulated camera");
        return Ok(Box::new(SimCamera::new("sim-camera")));
    }
    Err(FieldError::Init {
        component: format!("cam{}", cfg.camera_index),
        details: "built without the `opencv` feature; rebuild with `--features opencv` or pass --sim"
            .to_string(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner(cli: &Cli, cfg: &Config) {
    println!();
    println!(
        "  {} {}",
        "fieldbot".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  decision service  {}", cfg.decision_url.bold());
    if cli.sim {
        println!("  hardware          {}", "simulated".yellow());
    } else {
        println!(
            "  controller        {} @ {} baud",
            cfg.serial_device.bold(),
            cfg.serial_baud
        );
        println!("  camera            index {}", cfg.camera_index);
    }
    println!();
}
