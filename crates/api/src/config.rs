//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Telegram bot credentials. Both must be set to enable the channel.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — order API port (default: `3000`)
/// - `GATEWAY_PORT` — auth check port (default: `3001`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL` — Postgres order store; in-memory when unset
/// - `BUS_PARTITIONS` — partitions per topic (default: `4`)
/// - `CONSUMER_MAX_ATTEMPTS` — deliveries before dead-lettering (default: `5`)
/// - `RPC_TIMEOUT_MS` — stock/payment call deadline (default: `5000`)
/// - `ASSEMBLY_TIME_UNIT_MS` — length of one build unit (default: `1000`)
/// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` — notification channel; logs when unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gateway_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub bus_partitions: u32,
    pub consumer_max_attempts: u32,
    pub rpc_timeout: Duration,
    pub assembly_time_unit: Duration,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log_format = match var("LOG_FORMAT") {
            None => defaults.log_format,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: v,
                    reason: "expected `pretty` or `json`".to_string(),
                });
            }
        };

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(&var, "PORT", defaults.port)?,
            gateway_port: parse(&var, "GATEWAY_PORT", defaults.gateway_port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            bus_partitions: positive(
                parse(&var, "BUS_PARTITIONS", defaults.bus_partitions)?,
                "BUS_PARTITIONS",
            )?,
            consumer_max_attempts: positive(
                parse(&var, "CONSUMER_MAX_ATTEMPTS", defaults.consumer_max_attempts)?,
                "CONSUMER_MAX_ATTEMPTS",
            )?,
            rpc_timeout: millis(&var, "RPC_TIMEOUT_MS", defaults.rpc_timeout)?,
            assembly_time_unit: millis(&var, "ASSEMBLY_TIME_UNIT_MS", defaults.assembly_time_unit)?,
            telegram,
        })
    }

    /// Returns the `"host:port"` bind address of the order API.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the `"host:port"` bind address of the auth check.
    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.host, self.gateway_port)
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive(value: u32, name: &'static str) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn millis(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms: u64 = parse(var, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            gateway_port: 3001,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            bus_partitions: 4,
            consumer_max_attempts: 5,
            rpc_timeout: Duration::from_secs(5),
            assembly_time_unit: Duration::from_secs(1),
            telegram: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.gateway_addr(), "0.0.0.0:3001");
        assert!(config.database_url.is_none());
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("GATEWAY_PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("BUS_PARTITIONS", "8"),
            ("CONSUMER_MAX_ATTEMPTS", "3"),
            ("RPC_TIMEOUT_MS", "250"),
            ("ASSEMBLY_TIME_UNIT_MS", "10"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.gateway_addr(), "127.0.0.1:8081");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(config.bus_partitions, 8);
        assert_eq!(config.consumer_max_attempts, 3);
        assert_eq!(config.rpc_timeout, Duration::from_millis(250));
        assert_eq!(config.assembly_time_unit, Duration::from_millis(10));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("PORT", " "), ("DATABASE_URL", "")]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let err = load(&[("BUS_PARTITIONS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BUS_PARTITIONS", .. }));
    }

    #[test]
    fn test_unknown_log_format() {
        let err = load(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "LOG_FORMAT", .. }));
    }

    #[test]
    fn test_telegram_needs_both_values() {
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t")]).unwrap().telegram.is_none());

        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "secret-token"),
            ("TELEGRAM_CHAT_ID", "42"),
        ])
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.chat_id, "42");
        assert!(!format!("{telegram:?}").contains("secret-token"));
    }
}
