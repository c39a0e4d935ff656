//! Session logger — a `log` backend that writes to a single file in the OS
//! data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\RedactFE\redactfe.log`
//!   Linux:    `~/.local/share/RedactFE/redactfe.log`
//!   macOS:    `~/Library/Application Support/RedactFE/redactfe.log`
//!
//! Filtering follows `env_logger` syntax read from `REDACTFE_LOG`
//! (e.g. `debug`, `redactfe::session=trace`), default `info`. Records at
//! `warn` and above are mirrored to stderr through the same `env_logger`.

use env_logger::Env;
use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "REDACTFE_LOG";

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    started: Instant,
    /// Filter parsed from `REDACTFE_LOG`; also writes the stderr mirror.
    stderr: env_logger::Logger,
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.stderr.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.stderr.matches(record) {
            return;
        }
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let line = format_line(self.started.elapsed(), record.level(), record.args());
            let _ = writeln!(file, "{}", line);
        }
        if record.level() <= Level::Warn {
            self.stderr.log(record);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
        self.stderr.flush();
    }
}

/// One log file line, stamped with the time since the session started.
fn format_line(elapsed: Duration, level: Level, message: &fmt::Arguments<'_>) -> String {
    format!("[+{:>9.3}s] [{:<5}] {}", elapsed.as_secs_f64(), level, message)
}

/// Initialise the GUI session logger. Call once before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => Some(Mutex::new(f)),
        Err(e) => {
            // Not fatal; warnings still reach stderr
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    };

    let stderr = env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, "info")).build();
    let max_level = stderr.filter();
    let logger = LOGGER.get_or_init(|| SessionLogger {
        file,
        started: Instant::now(),
        stderr,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(max_level);
    }

    let unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    log::info!("=== RedactFE session started (unix {}) ===", unix_secs);
    log::info!("Log file: {}", path.display());

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC: {}", info);
        log::logger().flush();
        prev(info);
    }));
}

/// Stderr-only logging for headless mode: `warn` by default, `info` with
/// `--verbose`, `REDACTFE_LOG` overriding both.
pub fn init_cli(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, default))
        .format_timestamp(None)
        .try_init();
}

fn log_file_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("RedactFE").join("redactfe.log")
}
