//! Entry point and runtime setup.

use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod backend;
mod config;
mod events;
mod input;
mod layout;
mod preview;
mod registry;
mod session;
mod shortcuts;
mod status;
mod tenant;
mod ui;
mod validator;
mod worker;

use config::{BACKEND_URL_ENV, Config};

/// Start file logging; the returned guard must outlive the app.
fn init_logging(log_file: &str) -> Result<WorkerGuard> {
    // Write to a file so stdout stays free for the TUI.
    let file_appender = tracing_appender::rolling::never(".", log_file);
    // Non-blocking writer; the guard flushes it on drop.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Plain text, no colour codes in the file.
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
/// Load config, start logging, run the UI, restore the terminal.
async fn main() -> Result<()> {
    // Config first; it names the log file.
    let cfg = Config::load_or_default(&PathBuf::from("config.toml"))?;
    // Keep the guard alive until main returns.
    let _log_guard = init_logging(&cfg.logging.file)?;
    // The environment wins over the file for the backend URL.
    let cfg = cfg.with_env_override(std::env::var(BACKEND_URL_ENV).ok());
    tracing::info!("app starting");

    // Switch the terminal over and run the UI.
    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal, cfg).await;
    // Always hand the terminal back, even on error.
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("app exiting");
    res
}
