use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{Result, SageError};

/// A log record as handed to a callback installed with [`log_set_callback`].
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub level: Level,
    pub target: &'a str,
    pub message: &'a str,
    pub file: &'a str,
    pub line: u32,
}

pub type LogCallback = Arc<dyn Fn(&LogRecord<'_>) + Send + Sync>;

const MODE_DISABLED: u8 = 0;
const MODE_STDERR: u8 = 1;
const MODE_CALLBACK: u8 = 2;

pub struct SageLogger {
    mode: AtomicU8,
    level: AtomicU8,
    callback: Mutex<Option<LogCallback>>,
}

impl SageLogger {
    const fn new() -> Self {
        Self {
            mode: AtomicU8::new(MODE_DISABLED),
            level: AtomicU8::new(LevelFilter::Off as u8),
            callback: Mutex::new(None),
        }
    }

    fn level(&self) -> LevelFilter {
        level_filter_from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: LevelFilter) {
        self.level.store(level as u8, Ordering::Relaxed);
        log::set_max_level(level);
    }

    fn set_mode(&self, mode: u8) {
        self.mode.store(mode, Ordering::Relaxed);
    }

    fn set_callback(&self, callback: Option<LogCallback>) {
        *self.callback.lock() = callback;
    }
}

impl Log for SageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match self.mode.load(Ordering::Relaxed) {
            MODE_STDERR => {
                eprintln!("[sage][{}] {}", record.level(), record.args());
            }
            MODE_CALLBACK => {
                // Clone out of the lock so a callback that logs cannot deadlock.
                let Some(callback) = self.callback.lock().clone() else {
                    return;
                };
                let message = record.args().to_string();
                callback(&LogRecord {
                    level: record.level(),
                    target: record.target(),
                    message: &message,
                    file: record.file().unwrap_or(""),
                    line: record.line().unwrap_or(0),
                });
            }
            _ => {}
        }
    }

    fn flush(&self) {}
}

static LOGGER: SageLogger = SageLogger::new();
static LOGGER_STATE: OnceLock<LoggerInstall> = OnceLock::new();

#[derive(Copy, Clone)]
enum LoggerInstall {
    Installed,
    External,
}

fn init_logger() -> LoggerInstall {
    *LOGGER_STATE.get_or_init(|| match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(LevelFilter::Off);
            LoggerInstall::Installed
        }
        Err(_) => LoggerInstall::External,
    })
}

fn level_filter_from_u8(level: u8) -> LevelFilter {
    match level {
        x if x == LevelFilter::Error as u8 => LevelFilter::Error,
        x if x == LevelFilter::Warn as u8 => LevelFilter::Warn,
        x if x == LevelFilter::Info as u8 => LevelFilter::Info,
        x if x == LevelFilter::Debug as u8 => LevelFilter::Debug,
        x if x == LevelFilter::Trace as u8 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

fn external_logger() -> SageError {
    SageError::configuration("another logger is already installed for this process")
}

/// Route records at or above `level` to stderr.
pub fn log_set_stderr(level: LevelFilter) -> Result<()> {
    if matches!(init_logger(), LoggerInstall::External) {
        return Err(external_logger());
    }
    LOGGER.set_callback(None);
    LOGGER.set_mode(MODE_STDERR);
    LOGGER.set_level(level);
    Ok(())
}

/// Route records at or above `level` to `callback`. Passing `None` disables logging.
pub fn log_set_callback(callback: Option<LogCallback>, level: LevelFilter) -> Result<()> {
    let Some(callback) = callback else {
        log_disable();
        return Ok(());
    };
    if matches!(init_logger(), LoggerInstall::External) {
        return Err(external_logger());
    }
    LOGGER.set_callback(Some(callback));
    LOGGER.set_mode(MODE_CALLBACK);
    LOGGER.set_level(level);
    Ok(())
}

/// Adjust the level. When a host logger owns the facade only the global max level moves.
pub fn log_set_level(level: LevelFilter) {
    match init_logger() {
        LoggerInstall::Installed => LOGGER.set_level(level),
        LoggerInstall::External => log::set_max_level(level),
    }
}

pub fn log_disable() {
    match init_logger() {
        LoggerInstall::Installed => {
            LOGGER.set_mode(MODE_DISABLED);
            LOGGER.set_callback(None);
            LOGGER.set_level(LevelFilter::Off);
        }
        LoggerInstall::External => log::set_max_level(LevelFilter::Off),
    }
}
