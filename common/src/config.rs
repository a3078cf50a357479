//! Service configuration.
//!
//! Configuration is read from environment variables. Unset or unparseable
//! values fall back to defaults.

use std::time::Duration;

/// Default autosave debounce delay in milliseconds.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// Default executor timeout in seconds.
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 30;

/// Which executor implementations a service wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorMode {
    /// Canned responses, no network or database access.
    Simulated,
    /// Real HTTP requests and SQL queries.
    Live,
}

impl std::str::FromStr for ExecutorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "simulation" => Ok(ExecutorMode::Simulated),
            "live" => Ok(ExecutorMode::Live),
            other => Err(format!("unknown executor mode: {}", other)),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service using this configuration.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// SQLite URL for draft persistence; drafts stay in memory when unset.
    pub database_url: Option<String>,
    /// Autosave debounce delay in milliseconds.
    pub autosave_delay_ms: u64,
    /// Executor implementations to use.
    pub executor_mode: ExecutorMode,
    /// Upper bound for a single executor call, in seconds.
    pub executor_timeout_secs: u64,
    /// Artificial delay added by simulated executors, in milliseconds.
    pub simulated_latency_ms: u64,
    /// SQLite URL queried by the live SQL executor.
    pub sql_target_url: Option<String>,
    /// JSON file with table metadata used to seed the table catalog.
    pub tables_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            executor_mode: ExecutorMode::Simulated,
            executor_timeout_secs: DEFAULT_EXECUTOR_TIMEOUT_SECS,
            simulated_latency_ms: 0,
            sql_target_url: None,
            tables_file: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration for `service` from the process environment.
    pub fn load_with_service(service: &str) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` to resolve variables.
    pub fn from_lookup<F>(service: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            service_name: service.to_string(),
            host: non_empty("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or("SERVER_PORT", non_empty("SERVER_PORT"), defaults.port),
            database_url: non_empty("DATABASE_URL"),
            autosave_delay_ms: parse_or(
                "AUTOSAVE_DELAY_MS",
                non_empty("AUTOSAVE_DELAY_MS"),
                defaults.autosave_delay_ms,
            ),
            executor_mode: parse_or(
                "EXECUTOR_MODE",
                non_empty("EXECUTOR_MODE"),
                defaults.executor_mode,
            ),
            executor_timeout_secs: parse_or(
                "EXECUTOR_TIMEOUT_SECS",
                non_empty("EXECUTOR_TIMEOUT_SECS"),
                defaults.executor_timeout_secs,
            ),
            simulated_latency_ms: parse_or(
                "SIMULATED_LATENCY_MS",
                non_empty("SIMULATED_LATENCY_MS"),
                defaults.simulated_latency_ms,
            ),
            sql_target_url: non_empty("SQL_TARGET_URL"),
            tables_file: non_empty("TABLES_FILE"),
        }
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn executor_timeout(&self) -> Duration {
        Duration::from_secs(self.executor_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, "invalid configuration value, using default");
                default
            }
        },
        None => default,
    }
}
