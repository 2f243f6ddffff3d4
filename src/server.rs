//! Reusable slot-booking service runtime.
//!
//! [`ServiceHandle`] owns the full lifecycle: database init, migrations,
//! service wiring, the two background reconcilers, metrics and graceful
//! shutdown. The CLI binary is a thin wrapper around it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::events::{create_event_bus, SharedEventBus};
use crate::application::services::{
    start_booking_expiry_task, start_stale_session_task, BookingExpiryReconciler, BookingService,
    ChargerLockManager, EventBusNotifier, SessionStartService, SlotService,
    StaleSessionReconciler, StationAccessRegistry,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::{
    init_database, run_migrations, SeaOrmRepositoryProvider, SeaOrmWalletLedger,
};
use crate::shared::errors::InfraError;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the service.
pub struct ServiceOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServiceHandle ──────────────────────────────────────────────────

/// Handle to a running slot-booking service.
///
/// Exposes the wired services so an embedding transport (HTTP, gRPC, a
/// desktop shell) can call them directly.
///
/// ```rust,no_run
/// use ev_slot_booking::server::{ServiceHandle, ServiceOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServiceHandle::start(ServiceOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServiceHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub event_bus: SharedEventBus,
    pub locks: Arc<ChargerLockManager>,
    pub slots: Arc<SlotService>,
    pub bookings: Arc<BookingService>,
    pub sessions: Arc<SessionStartService>,
    pub station_access: Arc<StationAccessRegistry>,
    pub wallet: Arc<SeaOrmWalletLedger>,
    /// The configuration the service was started with.
    pub config: AppConfig,

    metrics: Option<PrometheusHandle>,
    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Start the service.
    ///
    /// 1. Install the Prometheus metrics recorder
    /// 2. Connect to the database and run migrations
    /// 3. Wire repositories, lock manager and services
    /// 4. Spawn the booking expiry and stale session reconcilers
    pub async fn start(opts: ServiceOptions) -> Result<Self, InfraError> {
        let app_cfg = opts.config;

        info!("Starting EV slot booking service...");

        // ── Prometheus metrics recorder ────────────────────────
        let metrics = install_metrics(app_cfg.server.metrics_addr.as_deref());

        // ── Database ───────────────────────────────────────────
        let db = init_database(&app_cfg.database_config()).await?;

        if opts.auto_migrate {
            run_migrations(&db).await?;
        }

        // ── Repositories & Services ────────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let locks = Arc::new(ChargerLockManager::new(repos.clone(), app_cfg.lock_wait()));
        let slots = Arc::new(SlotService::new(repos.clone(), locks.clone()));
        let bookings = Arc::new(BookingService::new(repos.clone()));
        let sessions = Arc::new(SessionStartService::new(
            repos.clone(),
            locks.clone(),
            bookings.clone(),
        ));
        let station_access = Arc::new(StationAccessRegistry::with_defaults(repos.clone()));
        let wallet = Arc::new(SeaOrmWalletLedger::new(db.clone()));

        // ── Event Bus ──────────────────────────────────────────
        let event_bus = create_event_bus();
        let notifier = Arc::new(EventBusNotifier::new(event_bus.clone()));
        info!("🔔 Event bus initialized for notifications");

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout_secs);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let expiry = Arc::new(BookingExpiryReconciler::new(repos.clone(), notifier.clone()));
        let stale = Arc::new(
            StaleSessionReconciler::new(repos.clone(), wallet.clone(), notifier.clone(), notifier)
                .with_timeout(std::time::Duration::from_secs(
                    app_cfg.reconciler.stale_timeout_secs,
                ))
                .with_retry(app_cfg.reconciler.refund_retry()),
        );

        let tasks = vec![
            start_booking_expiry_task(
                expiry,
                shutdown_signal.clone(),
                app_cfg.reconciler.expiry_interval_secs,
            ),
            start_stale_session_task(
                stale,
                shutdown_signal,
                app_cfg.reconciler.stale_check_interval_secs,
            ),
        ];

        info!("🚀 Slot booking service started");

        Ok(Self {
            repos,
            event_bus,
            locks,
            slots,
            bookings,
            sessions,
            station_access,
            wallet,
            config: app_cfg,
            metrics,
            db,
            shutdown,
            tasks,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the background tasks to stop after shutdown was triggered,
    /// then close the database.
    pub async fn wait(self) {
        info!("⏳ Waiting for background tasks to complete...");

        let tasks = self.tasks;
        self.shutdown
            .run_cleanup(async move {
                for task in tasks {
                    if let Err(e) = task.await {
                        error!(error = %e, "Background task panicked");
                    }
                }
            })
            .await;

        if let Err(e) = self.db.close().await {
            warn!(error = %e, "Error closing database connection");
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 Slot booking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down slot booking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Current counters in Prometheus text format, if a recorder is installed.
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(PrometheusHandle::render)
    }
}

/// Install the global Prometheus recorder, serving `/metrics` on `addr` when
/// one is configured. The global recorder can only be installed once per
/// process; later calls reuse the first handle.
fn install_metrics(addr: Option<&str>) -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| {
            let listen = addr.and_then(|raw| match raw.parse::<SocketAddr>() {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!(addr = raw, error = %e, "Invalid metrics address, scrape endpoint disabled");
                    None
                }
            });

            let Some(listen) = listen else {
                return match PrometheusBuilder::new().install_recorder() {
                    Ok(h) => {
                        info!("📊 Prometheus metrics recorder installed");
                        Some(h)
                    }
                    Err(e) => {
                        warn!(error = %e, "Prometheus metrics recorder not installed");
                        None
                    }
                };
            };

            let (recorder, exporter) = match PrometheusBuilder::new()
                .with_http_listener(listen)
                .build()
            {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(addr = %listen, error = %e, "Prometheus exporter not built");
                    return None;
                }
            };
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                warn!(error = %e, "Prometheus metrics recorder not installed");
                return None;
            }
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    warn!(error = ?e, "Metrics endpoint stopped");
                }
            });
            info!(addr = %listen, "📊 Prometheus metrics served at /metrics");
            Some(handle)
        })
        .clone()
}

/// Initialize tracing from the logging section.
///
/// Call once at process startup, before [`ServiceHandle::start`].
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChargerKey;
    use chrono::Utc;

    fn memory_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite::memory:".to_string();
        cfg.database.max_connections = 1;
        cfg
    }

    #[tokio::test]
    async fn start_wires_services_and_shuts_down() {
        let handle = ServiceHandle::start(ServiceOptions {
            config: memory_config(),
            auto_migrate: true,
        })
        .await
        .expect("service starts");
        assert!(handle.is_running());

        let station = handle.repos.stations().create("Depot").await.unwrap();
        let charger = handle
            .repos
            .chargers()
            .create(station.id, "CP-1", crate::domain::ChargerStatus::Available)
            .await
            .unwrap();

        let session = handle
            .sessions
            .start_session(7, ChargerKey::OcppId("CP-1".into()), 0, Utc::now())
            .await
            .unwrap();
        assert_eq!(session.charger_id, charger.id);
        assert!(handle.station_access.supports("dealer"));

        let rendered = handle.render_metrics().expect("recorder installed");
        assert!(rendered.contains("sessions_started_total"));

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown())
            .await
            .expect("shutdown completes");
    }
}
