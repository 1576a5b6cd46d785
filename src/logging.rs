//! File-backed tracing setup shared by both binaries.

use std::sync::OnceLock;
use std::{fmt, time::SystemTime};

/// Timestamp formatter producing `YYYY-MM-DD-THH:MM:SS` log lines.
struct SweepTimer;

impl tracing_subscriber::fmt::time::FormatTime for SweepTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let secs = match SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => 0,
        };
        let s = crate::util::ts_to_date(Some(secs)); // "YYYY-MM-DD HH:MM:SS"
        let ts = s.replacen(' ', "-T", 1);
        w.write_str(&ts)
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initialize tracing writing to `~/.config/aptsweep/logs/aptsweep.log`,
/// falling back to stderr when the log file cannot be opened. Console output
/// stays on stdout untouched; the log is diagnostics only.
pub fn init(tool: &str) {
    let mut log_path = crate::paths::logs_dir();
    log_path.push("aptsweep.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(SweepTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(tool, path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(SweepTimer)
                .init();
            tracing::warn!(tool, error = %e, "failed to open log file; using stderr");
        }
    }
}
