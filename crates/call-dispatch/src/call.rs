//! Call value type

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CallCenterError, Result};

/// Unique call identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        CallId(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An incoming call waiting to be handled
///
/// A call is an immutable value: its duration is validated once at
/// construction and never changes. Duration is counted in abstract time
/// units; the agent scales it by its configured unit when handling.
///
/// # Examples
///
/// ```
/// use call_dispatch::Call;
///
/// let call = Call::new(5).unwrap();
/// assert_eq!(call.duration_units(), 5);
///
/// let random = Call::random_between(5, 10).unwrap();
/// assert!((5..=10).contains(&random.duration_units()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Call {
    id: CallId,
    duration: u64,
}

impl Call {
    /// Create a call with a fixed duration
    ///
    /// Fails with `InvalidArgument` when `duration` is negative.
    pub fn new(duration: i64) -> Result<Self> {
        let duration = u64::try_from(duration).map_err(|_| {
            CallCenterError::invalid_argument(format!(
                "call duration must be >= 0, got {}",
                duration
            ))
        })?;

        Ok(Self {
            id: CallId::new(),
            duration,
        })
    }

    /// Create a call with a duration drawn uniformly from `[min, max]`
    ///
    /// Fails with `InvalidArgument` when `min < 0` or `max < min`.
    pub fn random_between(min: i64, max: i64) -> Result<Self> {
        if min < 0 {
            return Err(CallCenterError::invalid_argument(format!(
                "minimum call duration must be >= 0, got {}",
                min
            )));
        }
        if max < min {
            return Err(CallCenterError::invalid_argument(format!(
                "maximum call duration {} is below minimum {}",
                max, min
            )));
        }

        let duration = rand::thread_rng().gen_range(min..=max);
        Self::new(duration)
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    /// Duration in time units
    pub fn duration_units(&self) -> u64 {
        self.duration
    }

    /// Wall-clock handling time for the given length of one time unit
    pub fn handling_time(&self, time_unit: Duration) -> Duration {
        let units = u32::try_from(self.duration).unwrap_or(u32::MAX);
        time_unit.saturating_mul(units)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call {} ({} units)", self.id, self.duration)
    }
}
