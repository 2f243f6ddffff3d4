//! EV Slot Booking CLI service
//!
//! Headless runner for the slot booking core: migrates the database, then
//! runs the booking expiry and stale session reconcilers until SIGINT/SIGTERM.
//!
//! ```sh
//! # Run with default config (~/.config/ev-slot-booking/config.toml)
//! slot-booking-service
//!
//! # Custom config path
//! slot-booking-service --config /etc/ev-slot-booking/config.toml
//!
//! # Validate config without starting
//! slot-booking-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ev_slot_booking::config::AppConfig;
use ev_slot_booking::server::{init_tracing, ServiceHandle, ServiceOptions};

/// Slot booking service for EV chargers.
#[derive(Parser, Debug)]
#[command(
    name = "slot-booking-service",
    version,
    about = "Slot booking and session reconciliation for EV chargers",
    long_about = "Runs the slot booking core: database migrations, booking expiry \
                  and stale session reconciliation.\n\n\
                  Default config: ~/.config/ev-slot-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "SLOT_BOOKING_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(ev_slot_booking::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            if cli.check {
                return Err(e.into());
            }
            error!("Using default configuration.");
        }
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file      : {}", config_path.display());
        println!("   Database         : {}", config.database.url);
        println!("   Log level        : {}", config.logging.level);
        println!("   Lock wait        : {} ms", config.locking.wait_timeout_ms);
        println!("   Expiry interval  : {} s", config.reconciler.expiry_interval_secs);
        println!("   Stale timeout    : {} s", config.reconciler.stale_timeout_secs);
        return Ok(());
    }

    // ── Start service ──────────────────────────────────────────
    let handle = ServiceHandle::start(ServiceOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
