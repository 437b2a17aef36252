//! Process-level configuration: where the database lives, how long `stop()` waits for tasks to
//! drain, and how logging is formatted. None of this is part of the scheduling core itself —
//! it is the ambient layer the enclosing binary uses to construct one.

use crate::errors::SchedulerError;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Output format for the process's log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colorized for a terminal
    Pretty,
    /// One JSON object per line, suited for log aggregation
    Json,
}

/// Scheduler process configuration, merged from defaults, an optional YAML file, and
/// `CADENCE_`-prefixed environment variables, in that precedence order. Callers assembling one
/// by hand (tests, `Figment`-less callers) use the generated builder; [`SchedulerConfig::load`]
/// is the usual entry point for the binary.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct SchedulerConfig {
    /// Path to the SQLite database file backing the storage adapter
    #[builder(setter(into))]
    pub database_path: PathBuf,
    /// How long `stop()` waits for in-flight tasks to exit before returning `StopTimeout`
    #[serde(with = "duration_secs")]
    #[builder(default = Duration::from_millis(100))]
    pub stop_grace_period: Duration,
    /// Minimum level tracing emits, e.g. `"info"`, `"debug"`
    #[builder(default = "info".to_string(), setter(into))]
    pub log_level: String,
    /// Output format for the log stream
    #[builder(default = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("cadence.sqlite"),
            stop_grace_period: Duration::from_millis(100),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl SchedulerConfig {
    /// Loads configuration by merging, in increasing precedence: built-in defaults, an
    /// optional `cadence.yaml` in the working directory, then `CADENCE_*` environment
    /// variables (e.g. `CADENCE_DATABASE_PATH`, `CADENCE_LOG_LEVEL`)
    pub fn load() -> Result<Self, SchedulerError> {
        let config: SchedulerConfig = Figment::new()
            .merge(Serialized::defaults(SchedulerConfig::default()))
            .merge(Yaml::file("cadence.yaml"))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
            .map_err(|e| SchedulerError::ConfigError(e.to_string()))?;

        if config.database_path.as_os_str().is_empty() {
            return Err(SchedulerError::ConfigError(
                "database_path must not be empty".to_string(),
            ));
        }

        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_config_file() {
        let config = SchedulerConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.stop_grace_period, Duration::from_millis(100));
    }
}
