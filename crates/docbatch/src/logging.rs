use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Also write a session log file into `log_directory`.
    pub log_to_file: bool,
    pub log_directory: PathBuf,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_filter: "docbatch=info".to_string(),
            log_to_file: false,
            log_directory: std::env::temp_dir().join("docbatch-logs"),
        }
    }
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Returns the session log file when one was opened. A log file that cannot
/// be created is reported and skipped. Calling this again is a no-op.
pub fn init_logging(options: &LoggingOptions) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let mut file_error = None;
    let (file_layer, log_path) = if options.log_to_file {
        match open_log_file(&options.log_directory) {
            Ok((file, path)) => (
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                ),
                Some(path),
            ),
            Err(e) => {
                file_error = Some(e);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logging already initialised");
        return None;
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge not installed: {}", e);
    }

    if let Some(e) = file_error {
        warn!(
            "Failed to create log file in {}: {}",
            options.log_directory.display(),
            e
        );
    }
    if let Some(path) = &log_path {
        debug!("Logging to {}", path.display());
    }

    log_path
}

/// Creates `<dir>/docbatch-<timestamp>.log`.
pub fn open_log_file(dir: &Path) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let name = format!("docbatch-{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((file, path))
}
