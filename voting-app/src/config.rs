use error_stack::{Report, ResultExt};
use repositories::sheet::RetryPolicy;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const PORT_VAR: &str = "VOTING_PORT";
pub const SHEET_URL_VAR: &str = "VOTING_SHEET_URL";
pub const SHEET_TOKEN_VAR: &str = "VOTING_SHEET_TOKEN";
pub const STORAGE_TIMEOUT_VAR: &str = "VOTING_STORAGE_TIMEOUT_MS";
pub const STORAGE_ATTEMPTS_VAR: &str = "VOTING_STORAGE_ATTEMPTS";
pub const STORAGE_BACKOFF_VAR: &str = "VOTING_STORAGE_BACKOFF_MS";
pub const METRICS_VAR: &str = "VOTING_METRICS";

#[derive(Debug, thiserror::Error)]
#[error("the environment is misconfigured")]
pub struct ConfigError;

pub type ConfigResult<T> = Result<T, Report<ConfigError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Without a url, topics and votes live in memory and are lost on shutdown.
    pub sheet_url: Option<String>,
    pub sheet_token: Option<String>,
    pub retry: RetryPolicy,
    pub metrics: bool,
}

impl AppConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = RetryPolicy::default();

        let config = Self {
            port: load(&lookup, PORT_VAR, 3001)?,
            sheet_url: non_blank(&lookup, SHEET_URL_VAR),
            sheet_token: non_blank(&lookup, SHEET_TOKEN_VAR),
            retry: RetryPolicy {
                attempts: load(&lookup, STORAGE_ATTEMPTS_VAR, defaults.attempts)?,
                timeout: Duration::from_millis(load(
                    &lookup,
                    STORAGE_TIMEOUT_VAR,
                    millis(defaults.timeout),
                )?),
                backoff: Duration::from_millis(load(
                    &lookup,
                    STORAGE_BACKOFF_VAR,
                    millis(defaults.backoff),
                )?),
            },
            metrics: load(&lookup, METRICS_VAR, true)?,
        };

        if config.retry.attempts == 0 {
            return Err(Report::new(ConfigError))
                .attach(format!("{STORAGE_ATTEMPTS_VAR} must be at least 1"));
        }

        Ok(config)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> ConfigResult<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_blank(lookup, key) {
        Some(raw) => {
            debug!("{key} set to {raw}");
            raw.parse()
                .change_context(ConfigError)
                .attach_with(|| format!("invalid {key} value: '{raw}'"))
        }
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
