//! Command-line configuration.
//!
//! The flag grammar is deliberately permissive: anything that is not a
//! well-formed `--key=value` pair with a recognized key is ignored without
//! comment, and malformed values fall back to their defaults instead of
//! erroring. Arguments are scanned from last to first, so when a flag is
//! repeated the last occurrence on the command line is the one that takes
//! effect.

use log::LevelFilter;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8910;
pub const DEFAULT_PROXY_CLASS: &str = "org.openqa.grid.selenium.proxy.DefaultRemoteProxy";

const RECOGNIZED_KEYS: &[&str] = &["ip", "port", "hub", "proxy", "logFile", "logLevel", "logColor"];

/// Resolved server configuration. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: u16,
    pub hub: Option<String>,
    pub proxy_class: String,
    pub driver_version: &'static str,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub log_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            hub: None,
            proxy_class: DEFAULT_PROXY_CLASS.to_string(),
            driver_version: env!("CARGO_PKG_VERSION"),
            log_file: None,
            log_level: LevelFilter::Info,
            log_color: false,
        }
    }
}

impl Config {
    /// Parse arguments and apply the resolved log settings to the
    /// process-wide logger. Logging must be live before anything else
    /// starts, which is why the two concerns are coupled here.
    pub fn init<I: IntoIterator<Item = String>>(argv: I) -> Self {
        let args: Vec<String> = argv.into_iter().collect();
        let config = Self::parse(&args);
        config.apply_logging();
        config
    }

    /// Pure parsing step, separated so tests can exercise precedence and
    /// fallback without touching the global logger.
    pub fn parse(args: &[String]) -> Self {
        let mut raw: HashMap<&'static str, &str> = HashMap::new();

        // Last-to-first scan with first-write-wins: the final occurrence of
        // a duplicated flag is the one that sticks.
        for arg in args.iter().rev() {
            let Some((key, value)) = split_flag(arg) else {
                continue;
            };
            let Some(&known) = RECOGNIZED_KEYS.iter().find(|k| **k == key) else {
                continue;
            };
            raw.entry(known).or_insert(value);
        }

        let mut config = Config::default();
        if let Some(ip) = raw.get("ip") {
            config.ip = (*ip).to_string();
        }
        if let Some(port) = raw.get("port")
            && let Ok(port) = port.parse::<u16>()
        {
            config.port = port;
        }
        if let Some(hub) = raw.get("hub") {
            config.hub = Some((*hub).to_string());
        }
        if let Some(proxy) = raw.get("proxy") {
            config.proxy_class = (*proxy).to_string();
        }
        if let Some(path) = raw.get("logFile") {
            config.log_file = Some(PathBuf::from(path));
        }
        if let Some(level) = raw.get("logLevel") {
            config.log_level = parse_log_level(level);
        }
        if let Some(color) = raw.get("logColor") {
            config.log_color = parse_log_color(color);
        }
        config
    }

    /// Point the process logger at the configured level, color mode and
    /// target. Repeat calls are no-ops (the first initialization wins),
    /// which keeps test runs safe.
    pub fn apply_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.log_level);
        builder.write_style(if self.log_color {
            env_logger::WriteStyle::Always
        } else {
            env_logger::WriteStyle::Never
        });
        if let Some(path) = &self.log_file {
            match File::create(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => {
                    eprintln!("cannot open log file {}: {e}", path.display());
                }
            }
        }
        let _ = builder.try_init();
    }
}

/// Accept only `--key=value` where the key is ASCII-alphabetic and the
/// value draws from `[A-Za-z0-9_/\:.]`. Everything else is silently
/// dropped.
fn split_flag(arg: &str) -> Option<(&str, &str)> {
    let rest = arg.strip_prefix("--")?;
    let (key, value) = rest.split_once('=')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if value.is_empty() || !value.chars().all(is_value_char) {
        return None;
    }
    Some((key, value))
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '\\' | ':' | '.')
}

/// Upper-case and validate against the fixed level set; anything else
/// means INFO.
fn parse_log_level(value: &str) -> LevelFilter {
    match value.to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// The color flag is a JSON boolean literal; anything else means false.
fn parse_log_color(value: &str) -> bool {
    serde_json::from_str::<bool>(value).unwrap_or(false)
}
