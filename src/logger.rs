//! Logging setup for whisper
//!
//! Plain human-readable output goes through `env_logger`. Setting
//! `WHISPER_LOG_LEVEL=json` (or `json:<level>`) switches to one JSON object per
//! line, written to stderr or to `WHISPER_LOG_PATH` when that is set.

use chrono::{Local, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once the JSON logger has been installed
static JSON_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Environment variable holding the log level (`debug`, `json:trace`, ...)
pub const LOG_LEVEL_ENV: &str = "WHISPER_LOG_LEVEL";

/// Environment variable holding an optional JSON log file path
pub const LOG_PATH_ENV: &str = "WHISPER_LOG_PATH";

/// JSON logger implementation
#[derive(Debug)]
pub struct JsonLogger {
    level: Level,
    target_file: Mutex<Option<std::fs::File>>,
}

impl JsonLogger {
    /// Create a new JSON logger
    pub fn new(level: Level, log_path: Option<String>) -> Self {
        let target_file = if let Some(path) = log_path {
            OpenOptions::new().create(true).append(true).open(path).ok()
        } else {
            None
        };

        JsonLogger {
            level,
            target_file: Mutex::new(target_file),
        }
    }

    /// Initialize the logger with specified level and source
    ///
    /// Returns the effective level name and the source it came from.
    pub fn init_with_level(level_str: &str, source: &str) -> (String, String) {
        let (use_json, actual_level) = split_json_prefix(level_str);

        if !use_json {
            env_logger::Builder::new()
                .filter_level(parse_level_filter(actual_level))
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "<{}> [{}] {}",
                        record.level(),
                        Local::now().format("%H:%M:%S"),
                        record.args()
                    )
                })
                .init();
            return (actual_level.to_string(), source.to_string());
        }

        let level = parse_level_filter(actual_level)
            .to_level()
            .unwrap_or(Level::Info);
        let logger = Box::new(JsonLogger::new(level, env::var(LOG_PATH_ENV).ok()));

        if let Err(e) = log::set_boxed_logger(logger) {
            eprintln!("Failed to initialize JSON logger: {e}");
            return (actual_level.to_string(), source.to_string());
        }

        log::set_max_level(level.to_level_filter());
        JSON_ACTIVE.store(true, Ordering::Relaxed);
        (actual_level.to_string(), source.to_string())
    }

    /// Initialize from `WHISPER_LOG_LEVEL`, defaulting to `info`
    pub fn init() {
        let log_level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        Self::init_with_level(&log_level, LOG_LEVEL_ENV);
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_entry = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "@level": record.level().to_string().to_lowercase(),
            "@message": record.args().to_string(),
            "@module": record.target(),
            "@pid": std::process::id(),
        });

        let json_string = format!(
            "{}\n",
            serde_json::to_string(&log_entry).unwrap_or_default()
        );

        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.write_all(json_string.as_bytes());
                let _ = file.flush();
                return;
            }
        }
        let _ = io::stderr().write_all(json_string.as_bytes());
        let _ = io::stderr().flush();
    }

    fn flush(&self) {
        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.flush();
            }
        }
        let _ = io::stderr().flush();
    }
}

/// Strip a `json` / `json:` prefix from a level string
fn split_json_prefix(level_str: &str) -> (bool, &str) {
    if let Some(stripped) = level_str.strip_prefix("json:") {
        (true, stripped)
    } else if level_str == "json" {
        (true, "info")
    } else {
        (false, level_str)
    }
}

fn parse_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Whether the installed logger writes JSON
pub fn is_json_logging() -> bool {
    JSON_ACTIVE.load(Ordering::Relaxed)
}

/// Whether a level string selects JSON output
pub fn is_json_level(level_str: &str) -> bool {
    split_json_prefix(level_str).0
}

/// Debug level for `--verbose`, keeping JSON output if `requested` asked for it
pub fn verbose_level(requested: Option<&str>) -> &'static str {
    match requested {
        Some(level) if is_json_level(level) => "json:debug",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_json_prefix() {
        assert_eq!(split_json_prefix("json:debug"), (true, "debug"));
        assert_eq!(split_json_prefix("json"), (true, "info"));
        assert_eq!(split_json_prefix("warn"), (false, "warn"));
    }

    #[test]
    fn test_json_level_detection() {
        assert!(is_json_level("json"));
        assert!(is_json_level("json:trace"));
        assert!(!is_json_level("debug"));
        assert!(!is_json_level("jsonish"));
    }

    #[test]
    fn test_verbose_keeps_json_output() {
        assert_eq!(verbose_level(Some("json:warn")), "json:debug");
        assert_eq!(verbose_level(Some("json")), "json:debug");
        assert_eq!(verbose_level(Some("error")), "debug");
        assert_eq!(verbose_level(None), "debug");
    }

    #[test]
    fn test_parse_level_filter_defaults_to_info() {
        assert_eq!(parse_level_filter("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level_filter("warning"), LevelFilter::Warn);
        assert_eq!(parse_level_filter("chatty"), LevelFilter::Info);
    }
}
