mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use drive_uploader::config::ConfigManager;
use drive_uploader::events::EventBroadcaster;
use drive_uploader::logging;
use drive_uploader::scan;
use drive_uploader::uploader::progress::format_bytes;
use drive_uploader::uploader::{UploadStatus, UploadStore, Uploader};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::load(path.clone()),
        None => ConfigManager::load_default(),
    }
    .context("Failed to load configuration")?;

    let mut config = config_manager.get_config();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if cli.no_log_file {
        config.log_to_file = false;
    }

    // Keep the guard alive for the entire application lifetime
    let _log_guard = logging::init_logging(config.log_config())
        .context("Failed to initialize logging system")?;

    tracing::info!(
        target: "main",
        api = %config.api_base_url,
        config = %config_manager.config_path().display(),
        "Starting drive uploader"
    );

    let files = scan::collect_files(&cli.paths)
        .await
        .context("Failed to collect files")?;
    if files.is_empty() {
        tracing::warn!(target: "main", "Nothing to upload");
        return Ok(ExitCode::SUCCESS);
    }

    let client = drive_api::Client::new(config.client_config())
        .context("Failed to create API client")?;

    let store = UploadStore::new();
    let events = EventBroadcaster::default();
    let cancel_token = CancellationToken::new();
    let uploader = Uploader::with_http_transport(
        Arc::new(client),
        store.clone(),
        events.clone(),
        config.uploader_config(),
    )
    .context("Failed to create uploader")?
    .with_cancel_token(cancel_token.clone());

    tokio::spawn(cancel_on_signal(cancel_token));
    let reporter = tokio::spawn(report_progress(store.clone()));

    let report = uploader.run_batch(files, cli.parent.clone()).await;
    reporter.abort();

    for entry in store.snapshot().uploads {
        if entry.status == UploadStatus::Error {
            println!(
                "  failed: {} ({})",
                entry.name,
                entry.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!("{}", store.header_text());
    println!(
        "{} of {} files uploaded ({}), {} folders created",
        report.succeeded,
        report.total,
        format_bytes(report.bytes_uploaded),
        report.folders_created
    );

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Log the widget header whenever it changes
async fn report_progress(store: UploadStore) {
    let mut rx = store.subscribe();
    let mut last = String::new();
    while rx.changed().await.is_ok() {
        let header = rx.borrow_and_update().header_text();
        if header != last {
            tracing::info!(target: "main", "{}", header);
            last = header;
        }
    }
}

/// Cancel the running batch on Ctrl+C
async fn cancel_on_signal(cancel_token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!(target: "main", "Received Ctrl+C signal, cancelling uploads");
            cancel_token.cancel();
        }
        Err(e) => {
            tracing::warn!(target: "main", error = %e, "Failed to install Ctrl+C handler");
        }
    }
}
