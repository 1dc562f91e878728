use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env variable holding the filter directives, same syntax as `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "LEDITOR_LOG";
pub const LOG_DIRECTORY_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "leditor.log";
const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: stderr plus a log file inside `data_dir/logs`.
/// The returned guard must be kept alive until the end of main, dropping it flushes the file.
pub fn install_tracing(data_dir: &Path) -> Result<WorkerGuard> {
    let log_dir = data_dir.join(LOG_DIRECTORY_NAME);
    std::fs::create_dir_all(&log_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .into_diagnostic()
        .wrap_err("failed to build log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .into_diagnostic()
        .wrap_err("failed to install tracing subscriber")?;

    tracing::info!(log_dir = %log_dir.display(), "tracing installed");
    Ok(guard)
}
