//! Logging setup for sieve binaries.
//!
//! Everything goes to `~/.sieve/logs/<app>.log`; stderr only shows warnings
//! unless the caller asks for verbose output. A batch over a large export can
//! log a lot, so the file is capped and older contents are kept as
//! `<app>.log.1` (newest) through `<app>.log.N`.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use sieve_protocol::paths::default_logs_dir as logs_dir;

const DEFAULT_LOG_FILTER: &str = "sieve=info,sieve_stages=info,sieve_sinks=info";
const KEPT_LOGS: usize = 4;
const LOG_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only
    pub verbose: bool,
}

/// Initialize tracing with a capped log file and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let log_path = log_dir.join(format!("{}.log", config.app_name));
    let log_file = CappedLog::open(&log_path, KEPT_LOGS, LOG_SIZE_LIMIT)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(())
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Append-only log file that moves aside once it reaches `limit` bytes.
struct CappedLog {
    path: PathBuf,
    kept: usize,
    limit: u64,
    file: File,
    len: u64,
}

impl CappedLog {
    fn open(path: &Path, kept: usize, limit: u64) -> io::Result<Self> {
        let (file, len) = open_append(path)?;
        let mut log = Self {
            path: path.to_path_buf(),
            kept,
            limit,
            file,
            len,
        };
        if log.len >= log.limit {
            log.roll()?;
        }
        Ok(log)
    }

    fn history(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    /// `.log` becomes `.log.1`, `.log.1` becomes `.log.2`, and so on; the
    /// entry past `kept` falls off.
    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for n in (1..=self.kept).rev() {
            let from = if n == 1 {
                self.path.clone()
            } else {
                self.history(n - 1)
            };
            let to = self.history(n);
            if to.exists() {
                fs::remove_file(&to)?;
            }
            if from.exists() {
                fs::rename(&from, &to)?;
            }
        }
        let (file, len) = open_append(&self.path)?;
        self.file = file;
        self.len = len;
        Ok(())
    }
}

impl Write for CappedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.len > 0 && self.len + buf.len() as u64 > self.limit {
            self.roll()?;
        }
        let written = self.file.write(buf)?;
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}
