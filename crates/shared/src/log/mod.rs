// Logging module
// Rust equivalent of Log.h/cpp using the tracing crate
//
// The C++ code uses a custom logging system with multiple output files and
// log levels. In Rust, we use the `tracing` ecosystem which provides:
// - Structured logging
// - Multiple subscribers (file, stdout)
// - Log levels (ERROR, WARN, INFO, DEBUG, TRACE)
// - Filtering

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling;
use std::path::Path;

/// Initialize the logging system. `file_prefix` names the rolling log file
/// (e.g. "realmd" or "worldd") when `log_dir` is set.
pub fn initialize_logging(log_dir: Option<&str>, log_level: &str, file_prefix: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if let Some(dir) = log_dir {
        let path = Path::new(dir);
        if !path.exists() {
            let _ = std::fs::create_dir_all(path);
        }

        let file_appender = rolling::daily(dir, format!("{file_prefix}.log"));
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

        // Keep the guard alive by leaking it (it lives for the program duration)
        std::mem::forget(_guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .init();
    }
}
