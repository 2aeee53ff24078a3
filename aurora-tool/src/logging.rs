use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::AuroraError;

/// Where log lines go.
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Default log file for the interactive chat, which owns the terminal.
pub fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aurora")
        .join("aurora.log")
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(target: LogTarget, verbose: bool) -> Result<Option<WorkerGuard>, AuroraError> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(build_env_filter(verbose))
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| AuroraError::Logging(e.to_string()))?;
            Ok(None)
        }
        LogTarget::File(path) => {
            let (dir, file_name) = split_log_path(&path);
            std::fs::create_dir_all(&dir)?;

            let file_appender = tracing_appender::rolling::never(&dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(build_env_filter(verbose))
                .with_writer(non_blocking)
                .with_ansi(false)
                .try_init()
                .map_err(|e| AuroraError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "aurora.log".to_string());
    (dir, file_name)
}
