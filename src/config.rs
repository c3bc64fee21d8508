//! Configuration types for vidgrab

use crate::error::{Error, Result};
use crate::progress::COMPLETE_PERCENT;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Timing and progress simulation settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SimulationConfig {
    /// Delay between an accepted analyze request and the job becoming ready (default: 1500 ms)
    #[serde(default = "default_analysis_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub analysis_delay: Duration,

    /// Interval between progress ticks while downloading (default: 500 ms)
    #[serde(default = "default_tick_interval", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub tick_interval: Duration,

    /// How each tick's progress step is chosen
    #[serde(default)]
    pub schedule: ProgressSchedule,

    /// Seed for the random step generator (None = seeded from entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            analysis_delay: default_analysis_delay(),
            tick_interval: default_tick_interval(),
            schedule: ProgressSchedule::default(),
            seed: None,
        }
    }
}

/// Progress step schedule
///
/// Every schedule has a strictly positive minimum step, so a download always
/// finishes within `ceil(100 / min_step)` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProgressSchedule {
    /// Uniformly random step in `[min_step, max_step]` percentage points
    Random {
        /// Smallest step per tick
        min_step: f32,
        /// Largest step per tick
        max_step: f32,
    },
    /// The same step on every tick
    Fixed {
        /// Step per tick
        step: f32,
    },
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        ProgressSchedule::Random {
            min_step: 2.0,
            max_step: 15.0,
        }
    }
}

impl ProgressSchedule {
    /// Smallest step this schedule can produce
    pub fn min_step(&self) -> f32 {
        match *self {
            ProgressSchedule::Random { min_step, .. } => min_step,
            ProgressSchedule::Fixed { step } => step,
        }
    }
}

/// Job behaviour switches and input rules
///
/// The two front-end variants disagree on identity and result locators, so
/// both are flags here.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobConfig {
    /// Host names accepted by the URL check (default: youtube.com, youtu.be)
    #[serde(default = "default_accepted_hosts")]
    pub accepted_hosts: Vec<String>,

    /// Message shown when the URL check fails
    #[serde(default = "default_invalid_url_message")]
    pub invalid_url_message: String,

    /// Require a signed-in user before a download may start (default: false)
    #[serde(default)]
    pub require_identity: bool,

    /// Attach a synthetic result locator on completion (default: true)
    #[serde(default = "default_true")]
    pub attach_result_locator: bool,

    /// Base of the synthetic result locator
    #[serde(default = "default_result_base_url")]
    pub result_base_url: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            accepted_hosts: default_accepted_hosts(),
            invalid_url_message: default_invalid_url_message(),
            require_identity: false,
            attach_result_locator: true,
            result_base_url: default_result_base_url(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// SQLite database path used by [`SqliteStore`](crate::store::SqliteStore) (default: "./vidgrab.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for [`JobMachine`](crate::JobMachine)
///
/// Fields are organized into sub-configs:
/// - [`simulation`](SimulationConfig) - analysis delay, tick interval, step schedule
/// - [`job`](JobConfig) - accepted hosts, identity and result locator switches
/// - [`persistence`](PersistenceConfig) - SQLite store location
/// - [`api`](ApiConfig) - REST API binding and CORS
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Timing and progress simulation
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Job behaviour switches
    #[serde(default)]
    pub job: JobConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Check the settings that would otherwise make the simulation misbehave
    pub fn validate(&self) -> Result<()> {
        if self.simulation.tick_interval.is_zero() {
            return Err(config_error(
                "tick interval must be greater than zero",
                "simulation.tick_interval",
            ));
        }

        match self.simulation.schedule {
            ProgressSchedule::Random { min_step, max_step } => {
                if min_step.is_nan() || min_step <= 0.0 {
                    return Err(config_error(
                        "min_step must be greater than zero",
                        "simulation.schedule.min_step",
                    ));
                }
                if min_step > COMPLETE_PERCENT {
                    return Err(config_error(
                        "min_step must not exceed 100",
                        "simulation.schedule.min_step",
                    ));
                }
                if max_step.is_nan() || max_step < min_step {
                    return Err(config_error(
                        "max_step must not be smaller than min_step",
                        "simulation.schedule.max_step",
                    ));
                }
                if max_step > COMPLETE_PERCENT {
                    return Err(config_error(
                        "max_step must not exceed 100",
                        "simulation.schedule.max_step",
                    ));
                }
            }
            ProgressSchedule::Fixed { step } => {
                if step.is_nan() || step <= 0.0 || step > COMPLETE_PERCENT {
                    return Err(config_error(
                        "step must be greater than zero and at most 100",
                        "simulation.schedule.step",
                    ));
                }
            }
        }

        if self
            .job
            .accepted_hosts
            .iter()
            .all(|host| host.trim().is_empty())
        {
            return Err(config_error(
                "at least one accepted host is required",
                "job.accepted_hosts",
            ));
        }

        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_analysis_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_accepted_hosts() -> Vec<String> {
    vec!["youtube.com".to_string(), "youtu.be".to_string()]
}

fn default_invalid_url_message() -> String {
    "Please enter a valid YouTube URL".to_string()
}

fn default_result_base_url() -> String {
    "https://files.vidgrab.invalid".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./vidgrab.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Durations are written as whole milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
