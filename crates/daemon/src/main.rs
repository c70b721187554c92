//! Quartermaster - Quarterly Partition Scheduler daemon
//! Wires the SQLite workbook, scheduler and JSON-RPC server together.

mod config;
mod telemetry;

use anyhow::Result;
use config::{LogFormat, Settings};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use quartermaster_api_rpc::{RpcServer, RpcServerConfig};
use quartermaster_core::application::{
    BackgroundScheduler, MaintenanceChecker, PartitionService, StoreSheetRegistry,
    TransitionEngine,
};
use quartermaster_core::port::id_provider::UuidProvider;
use quartermaster_core::port::time_provider::SystemTimeProvider;
use quartermaster_core::port::TimeProvider;
use quartermaster_infra_sqlite::SqliteWorkbookStore;

const DEFAULT_LOG_FILTER: &str = "quartermaster=info";
const LOG_FILE_NAME: &str = "quartermaster.log";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Subscriber the optional OpenTelemetry layer is stacked on
type FilteredRegistry = Layered<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();

    // 1. Logging
    let (otel_layer, otel_error) = match telemetry::layer::<FilteredRegistry>() {
        Ok(layer) => (layer, None),
        Err(e) => (None, Some(e)),
    };
    let _log_guard = init_logging(settings.log_format, settings.log_dir.as_deref(), otel_layer)?;

    info!(version = quartermaster_core::VERSION, "Quartermaster starting");
    for warning in &settings.warnings {
        warn!("{}", warning);
    }
    if let Some(e) = otel_error {
        warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    } else if telemetry::otlp_endpoint().is_some() && !telemetry::enabled() {
        warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
    }

    // 2. Dependencies
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteWorkbookStore::new());
    let registry = Arc::new(StoreSheetRegistry::new(store, settings.registry.clone()));

    let config_check = settings.registry.validate();
    if config_check.is_ok() {
        bootstrap_store(&registry, &settings).await;
    }

    let engine = Arc::new(TransitionEngine::new(registry.clone()));
    let checker = Arc::new(MaintenanceChecker::new(
        registry.clone(),
        Arc::new(UuidProvider),
        settings.maintenance.clone(),
    ));
    let scheduler = Arc::new(BackgroundScheduler::for_partitions(
        engine.clone(),
        checker.clone(),
        time_provider.clone(),
        settings.scheduler.clone(),
    ));

    let mut service = PartitionService::new(registry, engine, checker, time_provider);

    // 3. Scheduler (only with a valid configuration)
    match config_check {
        Ok(()) => {
            scheduler.start();
        }
        Err(e) => {
            error!(error = %e, "Configuration invalid, scheduler not started");
            service = service.with_invalid_config(e.to_string());
        }
    }

    // 4. JSON-RPC server
    let rpc_config = RpcServerConfig {
        port: settings.rpc_port,
        ..Default::default()
    };
    let (rpc_handle, rpc_addr) = RpcServer::new(rpc_config, Arc::new(service), scheduler.clone())
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(rpc_addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    if !scheduler.shutdown(SHUTDOWN_GRACE).await {
        warn!("Scheduler job still running at exit");
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}

fn init_logging<L>(
    format: LogFormat,
    log_dir: Option<&Path>,
    otel_layer: Option<L>,
) -> Result<Option<WorkerGuard>>
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(file_layer);

    match format {
        // Production: JSON structured logging
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        // Development: Pretty formatting with colors
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
    }
    Ok(guard)
}

/// Connect, then seed the Master Template if headers were configured
///
/// Failures are logged only: the registry reconnects lazily on the next job.
async fn bootstrap_store(registry: &StoreSheetRegistry, settings: &Settings) {
    if let Some(dir) = config::store_parent_dir(&settings.registry.credentials) {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Could not create workbook directory");
        }
    }

    if let Err(e) = registry.connect().await {
        warn!(error = %e, "Partition store unavailable at startup, will retry on next job");
        return;
    }

    if settings.template_headers.is_empty() {
        return;
    }
    match registry.ensure_template(&settings.template_headers).await {
        Ok(true) => info!(template = %settings.registry.template_sheet, "Master template seeded"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Could not seed master template"),
    }
}
