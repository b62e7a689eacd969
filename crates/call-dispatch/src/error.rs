use thiserror::Error;

/// Error types for call dispatch operations
///
/// Construction errors are surfaced synchronously to the caller. Assignment
/// failures and interrupted handling are recovered inside the routing and
/// processing loops and only show up in logs and counters.
///
/// # Examples
///
/// ```
/// use call_dispatch::{CallCenterError, Call};
///
/// match Call::new(-1) {
///     Err(CallCenterError::InvalidArgument(msg)) => println!("rejected: {}", msg),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallCenterError {
    /// Malformed constructor input
    ///
    /// # Examples
    /// - Negative call duration
    /// - Inverted or negative random duration bounds
    /// - Empty or missing agent roster
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A call could not be handed to an agent
    ///
    /// Transient. The routing loop logs it and puts the call back at the
    /// head of the pending queue.
    ///
    /// # Examples
    /// - Agent stopped accepting work between selection and handoff
    /// - Agent processing loop has shut down
    #[error("Assignment failure: {0}")]
    AssignmentFailure(String),

    /// Call handling was cancelled before its duration elapsed
    ///
    /// The agent still returns to `Available`. The call is not requeued.
    #[error("Handling interrupted: {0}")]
    HandlingInterrupted(String),

    /// Configuration validation and parsing errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lifecycle misuse, such as starting a dispatcher twice
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl CallCenterError {
    /// Create a new InvalidArgument error with the provided message
    ///
    /// # Examples
    ///
    /// ```
    /// use call_dispatch::CallCenterError;
    ///
    /// let error = CallCenterError::invalid_argument("duration must be >= 0");
    /// assert_eq!(error.to_string(), "Invalid argument: duration must be >= 0");
    /// ```
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new AssignmentFailure error with the provided message
    pub fn assignment<S: Into<String>>(msg: S) -> Self {
        Self::AssignmentFailure(msg.into())
    }

    /// Create a new HandlingInterrupted error with the provided message
    pub fn interrupted<S: Into<String>>(msg: S) -> Self {
        Self::HandlingInterrupted(msg.into())
    }

    /// Create a new Configuration error with the provided message
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Lifecycle error with the provided message
    pub fn lifecycle<S: Into<String>>(msg: S) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Whether the routing loop recovers from this error by retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AssignmentFailure(_))
    }
}

/// Result type for call dispatch operations
pub type Result<T> = std::result::Result<T, CallCenterError>;
