//! hasta-bridge - Hand-tracking to humanoid robot bridge daemon
//!
//! Listens for one tracking client (default `localhost:10000`), drives the
//! robot's arms and speech from its commands and streams camera frames back
//! until the client disconnects or SIGINT arrives.

use clap::Parser;
use hasta_bridge::bridge;
use hasta_bridge::devices::create_device;
use hasta_bridge::snapshot;
use hasta_bridge::{Config, Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); built-in defaults if omitted
    #[arg(value_name = "CONFIG")]
    config_path: Option<PathBuf>,

    /// Configuration file, flag form
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Capture one camera frame to this PNG file and exit
    #[arg(long, value_name = "PNG")]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("hasta-bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let config = match args.config.or(args.config_path) {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            Config::load(&path)?
        }
        None => {
            log::info!("No config given, using defaults");
            Config::default()
        }
    };

    log::info!(
        "Device: {} ({})",
        config.device.name,
        config.device.device_type
    );
    let mut device = create_device(&config.device)?;

    if let Some(path) = args.snapshot {
        return snapshot::capture(device.camera.as_mut(), &config.camera, &path);
    }

    let listener = bridge::bind(&config.network.bind_address)?;
    bridge::serve(listener, device, &config, running)?;

    log::info!("hasta-bridge stopped");
    Ok(())
}
