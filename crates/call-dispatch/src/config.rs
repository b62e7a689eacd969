//! Configuration for the dispatcher and the simulation driver

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CallCenterError, Result};

/// Dispatcher runtime configuration
///
/// # Examples
///
/// ```
/// use call_dispatch::DispatchConfig;
///
/// let config = DispatchConfig::default();
/// assert_eq!(config.time_unit_ms, 1000);
/// assert!(config.max_assignment_attempts.is_none());
/// config.validate().expect("default configuration is valid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Wall-clock length of one unit of call duration, in milliseconds
    pub time_unit_ms: u64,

    /// Delay before the routing loop retries after a failed assignment
    pub retry_delay_ms: u64,

    /// Optional cap on assignment attempts per call
    ///
    /// `None` retries forever. When set, a call that fails this many
    /// handoffs is parked on the dispatcher (see `Dispatcher::parked_calls`)
    /// rather than retried again.
    pub max_assignment_attempts: Option<u32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            retry_delay_ms: 50,
            max_assignment_attempts: None,
        }
    }
}

impl DispatchConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_unit_ms == 0 {
            return Err(CallCenterError::configuration("time_unit_ms must be greater than 0"));
        }
        if self.max_assignment_attempts == Some(0) {
            return Err(CallCenterError::configuration(
                "max_assignment_attempts must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// Roster composition for a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub operators: usize,
    pub supervisors: usize,
    pub directors: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            operators: 6,
            supervisors: 3,
            directors: 1,
        }
    }
}

impl RosterConfig {
    pub fn total(&self) -> usize {
        self.operators + self.supervisors + self.directors
    }
}

/// Call traffic generated by a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Number of calls to dispatch
    pub calls: usize,
    /// Inclusive lower bound on call duration, in time units
    pub min_duration: i64,
    /// Inclusive upper bound on call duration, in time units
    pub max_duration: i64,
    /// Pause between consecutive dispatches
    pub arrival_interval_ms: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            calls: 10,
            min_duration: 5,
            max_duration: 10,
            arrival_interval_ms: 1000,
        }
    }
}

/// Full simulation configuration, loadable from TOML
///
/// ```toml
/// [dispatch]
/// time_unit_ms = 100
///
/// [roster]
/// operators = 4
///
/// [traffic]
/// calls = 20
/// min_duration = 1
/// max_duration = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dispatch: DispatchConfig,
    pub roster: RosterConfig,
    pub traffic: TrafficConfig,
}

impl SimulationConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| CallCenterError::configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CallCenterError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.dispatch.validate()?;

        if self.roster.total() == 0 {
            return Err(CallCenterError::configuration("roster must contain at least one agent"));
        }
        if self.traffic.min_duration < 0 {
            return Err(CallCenterError::configuration("min_duration must be >= 0"));
        }
        if self.traffic.max_duration < self.traffic.min_duration {
            return Err(CallCenterError::configuration(
                "max_duration must be >= min_duration",
            ));
        }
        Ok(())
    }
}
