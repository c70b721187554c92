//! Daemon settings loaded from `QUARTERMASTER_*` environment variables
//!
//! Missing required values are left empty and rejected later by
//! `RegistryConfig::validate`. Invalid optional values fall back to their
//! defaults; the fallbacks are collected in `warnings` and logged once the
//! subscriber is installed.

use chrono::{NaiveTime, Weekday};
use quartermaster_api_rpc::DEFAULT_RPC_PORT;
use quartermaster_core::application::{MaintenanceConfig, SchedulerConfig};
use quartermaster_core::port::RegistryConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CREDENTIALS: &str = "QUARTERMASTER_CREDENTIALS";
pub const ENV_DOCUMENT_ID: &str = "QUARTERMASTER_DOCUMENT_ID";
pub const ENV_TEMPLATE_SHEET: &str = "QUARTERMASTER_TEMPLATE_SHEET";
pub const ENV_MAPPER_SHEET: &str = "QUARTERMASTER_MAPPER_SHEET";
pub const ENV_TEMPLATE_HEADERS: &str = "QUARTERMASTER_TEMPLATE_HEADERS";
pub const ENV_CALL_TIMEOUT_SECS: &str = "QUARTERMASTER_CALL_TIMEOUT_SECS";
pub const ENV_RPC_PORT: &str = "QUARTERMASTER_RPC_PORT";
pub const ENV_DAILY_AT: &str = "QUARTERMASTER_DAILY_AT";
pub const ENV_WEEKLY_DAY: &str = "QUARTERMASTER_WEEKLY_DAY";
pub const ENV_WEEKLY_AT: &str = "QUARTERMASTER_WEEKLY_AT";
pub const ENV_STARTUP_DELAY_SECS: &str = "QUARTERMASTER_STARTUP_DELAY_SECS";
pub const ENV_POLL_SECS: &str = "QUARTERMASTER_POLL_SECS";
pub const ENV_LOOKAHEAD_DAYS: &str = "QUARTERMASTER_LOOKAHEAD_DAYS";
pub const ENV_LOG_FORMAT: &str = "QUARTERMASTER_LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "QUARTERMASTER_LOG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: RegistryConfig,
    /// Seed for the Master Template when it does not exist yet
    pub template_headers: Vec<String>,
    pub rpc_port: u16,
    pub scheduler: SchedulerConfig,
    pub maintenance: MaintenanceConfig,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader {
            lookup,
            warnings: Vec::new(),
        };

        let mut registry = RegistryConfig::new(
            expand_store_url(&reader.string(ENV_CREDENTIALS).unwrap_or_default()),
            reader.string(ENV_DOCUMENT_ID).unwrap_or_default(),
        );
        if let Some(template) = reader.string(ENV_TEMPLATE_SHEET) {
            registry.template_sheet = template;
        }
        if let Some(mapper) = reader.string(ENV_MAPPER_SHEET) {
            registry.mapper_sheet = mapper;
        }
        registry.call_timeout = reader
            .parsed_if::<u64>(ENV_CALL_TIMEOUT_SECS, |secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(registry.call_timeout);

        let template_headers = reader
            .string(ENV_TEMPLATE_HEADERS)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            poll_interval: reader
                .parsed_if::<u64>(ENV_POLL_SECS, |secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            startup_delay: reader
                .parsed::<u64>(ENV_STARTUP_DELAY_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.startup_delay),
            daily_at: reader.time_of_day(ENV_DAILY_AT).unwrap_or(defaults.daily_at),
            weekly_day: reader.parsed::<Weekday>(ENV_WEEKLY_DAY).unwrap_or(defaults.weekly_day),
            weekly_at: reader.time_of_day(ENV_WEEKLY_AT).unwrap_or(defaults.weekly_at),
        };

        let maintenance = MaintenanceConfig {
            lookahead_days: reader
                .parsed_if::<i64>(ENV_LOOKAHEAD_DAYS, |days| *days >= 0)
                .unwrap_or(MaintenanceConfig::default().lookahead_days),
        };

        let log_format = match reader.string(ENV_LOG_FORMAT).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                reader.warn(ENV_LOG_FORMAT, other);
                LogFormat::Pretty
            }
        };

        Self {
            registry,
            template_headers,
            rpc_port: reader.parsed(ENV_RPC_PORT).unwrap_or(DEFAULT_RPC_PORT),
            scheduler,
            maintenance,
            log_format,
            log_dir: reader
                .string(ENV_LOG_DIR)
                .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned())),
            warnings: reader.warnings,
        }
    }
}

struct Reader<F> {
    lookup: F,
    warnings: Vec<String>,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn warn(&mut self, key: &str, value: &str) {
        self.warnings
            .push(format!("{}='{}' is invalid, using default", key, value));
    }

    fn parsed<T: FromStr>(&mut self, key: &str) -> Option<T> {
        self.parsed_if(key, |_| true)
    }

    /// Parsed value that also passes `accept`; anything else warns
    fn parsed_if<T: FromStr>(&mut self, key: &str, accept: impl Fn(&T) -> bool) -> Option<T> {
        let raw = self.string(key)?;
        match raw.parse() {
            Ok(value) if accept(&value) => Some(value),
            _ => {
                self.warn(key, &raw);
                None
            }
        }
    }

    /// `HH:MM`, UTC
    fn time_of_day(&mut self, key: &str) -> Option<NaiveTime> {
        let raw = self.string(key)?;
        match NaiveTime::parse_from_str(&raw, "%H:%M") {
            Ok(time) => Some(time),
            Err(_) => {
                self.warn(key, &raw);
                None
            }
        }
    }
}

/// Expand `~` in the path part of a `sqlite://` url
pub fn expand_store_url(url: &str) -> String {
    match url.strip_prefix("sqlite://") {
        Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
        None => url.to_string(),
    }
}

/// Directory that must exist before a file-backed workbook can be created
pub fn store_parent_dir(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    PathBuf::from(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
}
