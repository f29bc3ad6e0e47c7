//! Logging setup
//!
//! The full-screen editor owns the terminal, so logs go to a file only:
//! `~/.config/sqdesk/logs/sqdesk.log`, rotated daily. Filtering follows
//! `RUST_LOG` and defaults to `info` for this crate.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,sqdesk=info";

/// Install the global subscriber.
///
/// The returned guard flushes buffered log lines when dropped and must be
/// kept alive for the life of the program. Returns `None` when no log
/// directory can be created; logging is then disabled.
pub fn init() -> Option<WorkerGuard> {
    let logs_dir = crate::config::logs_dir()?;
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Could not initialize file logging: {}", e);
        return None;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_appender = tracing_appender::rolling::daily(logs_dir, "sqdesk.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: Could not initialize file logging: {}", e);
        return None;
    }
    Some(guard)
}
