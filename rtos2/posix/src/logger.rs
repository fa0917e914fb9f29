//! Stdout logger for hosted builds.
//!
//! Lines look like `[    1.234] DEBUG rtos2::kernel: scheduler started`.
//! The stamp is seconds since the logger was installed.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::Lazy;

/// Environment variable holding the log level filter
pub const LOG_ENV: &str = "RTOS2_LOG";

static ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

struct StdoutLogger;

static LOGGER: StdoutLogger = StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(ORIGIN.elapsed(), record);
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

fn format_line(elapsed: Duration, record: &Record<'_>) -> String {
    format!(
        "[{:>5}.{:03}] {:<5} {}: {}",
        elapsed.as_secs(),
        elapsed.subsec_millis(),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Install the stdout logger with a fixed level
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    Lazy::force(&ORIGIN);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Install the stdout logger with the level named by `RTOS2_LOG`, or `default`
pub fn init_from_env(default: LevelFilter) -> Result<(), SetLoggerError> {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default);
    init(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_line_format() {
        let line = format_line(
            Duration::from_millis(1_234),
            &Record::builder()
                .args(format_args!("scheduler started"))
                .level(Level::Debug)
                .target("rtos2::kernel")
                .build(),
        );
        assert_eq!(line, "[    1.234] DEBUG rtos2::kernel: scheduler started");
    }
}
