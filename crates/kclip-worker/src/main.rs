//! Dataset clip downloader binary.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kclip_media::CliTools;
use kclip_models::Catalog;
use kclip_worker::{metrics, Pool, TaskExpander, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting kclip");

    let config = WorkerConfig::from_env();
    info!("Config: {:?}", config);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let Some(catalog_path) = config.catalog_path.clone() else {
        error!("KCLIP_CATALOG is not set");
        std::process::exit(1);
    };

    let catalog = if config.hierarchical {
        Catalog::load_hierarchical(&catalog_path)
    } else {
        Catalog::load_flat(&catalog_path)
    };
    let catalog = match catalog {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to load catalog {}: {}", catalog_path.display(), e);
            std::process::exit(1);
        }
    };
    info!(videos = catalog.len(), "Catalog loaded");

    let metrics_handle = match &config.metrics_file {
        Some(_) => match metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                None
            }
        },
        None => None,
    };

    // Stop feeding on Ctrl-C; queued tasks still finish
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, draining queued tasks");
            let _ = shutdown_tx.send(true);
        }
    });

    let expander = TaskExpander::from_config(catalog, &config);
    let tools = Arc::new(CliTools::new(config.programs.clone()));
    let metrics_file = config.metrics_file.clone();

    let result = Pool::run(config, tools, &expander, shutdown_rx).await;

    if let (Some(handle), Some(path)) = (&metrics_handle, &metrics_file) {
        if let Err(e) = metrics::write_snapshot(handle, path).await {
            warn!("Failed to write metrics to {}: {}", path.display(), e);
        }
    }

    match result {
        Ok(report) => info!(
            enqueued = report.enqueued,
            processed = report.processed,
            failed = report.failed,
            worker_panics = report.worker_panics,
            interrupted = report.interrupted,
            "Run complete"
        ),
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kclip=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
