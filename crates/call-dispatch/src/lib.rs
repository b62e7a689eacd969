//! # call-dispatch
//!
//! In-process simulation of a call center: incoming calls queue up at a
//! dispatcher, which hands each one to the least escalated free agent.
//! Agents work their calls one at a time, staying `Busy` for the call's
//! duration before becoming `Available` again.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            DISPATCHER                               │
//! │   pending queue (FIFO, retries at head)  ──▶  routing loop          │
//! └──────────────────────────────┬──────────────────────────────────────┘
//!                                │ least escalated free agent
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!   ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!   │  Operators  │       │ Supervisors │       │  Directors  │
//!   │ priority 1  │       │ priority 2  │       │ priority 3  │
//!   └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Call**: immutable duration, validated at construction
//! - **Agent**: role-derived priority, `Available`/`Busy` state machine,
//!   inbound queue and completed log
//! - **Dispatcher**: routing authority over a fixed roster
//!
//! ## Quick Start
//!
//! ```rust
//! use call_dispatch::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let dispatcher = Arc::new(
//!     Dispatcher::builder()
//!         .with_roster(Agent::roster(&RosterConfig::default()))
//!         .with_config(DispatchConfig { time_unit_ms: 10, ..Default::default() })
//!         .build()?,
//! );
//!
//! dispatcher.start()?;
//! dispatcher.dispatch_call(Call::new(3)?);
//! dispatcher.wait_for_completions(1, std::time::Duration::from_secs(5)).await?;
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod call;

pub mod agent;
pub mod routing;
pub mod orchestrator;

pub use error::{CallCenterError, Result};
pub use config::{DispatchConfig, RosterConfig, SimulationConfig, TrafficConfig};
pub use call::{Call, CallId};
pub use agent::{Agent, AgentId, AgentRole, AgentStatus};
pub use orchestrator::{Dispatcher, DispatcherBuilder, DispatcherStats};

/// Prelude module for convenient imports
///
/// ```
/// use call_dispatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CallCenterError, Result};
    pub use crate::config::{DispatchConfig, RosterConfig, SimulationConfig, TrafficConfig};
    pub use crate::call::{Call, CallId};
    pub use crate::agent::{Agent, AgentId, AgentRole, AgentStatus, ProcessingContext};
    pub use crate::routing::{select_available_agent, RoutingOutcome};
    pub use crate::orchestrator::{Dispatcher, DispatcherBuilder, DispatcherStats};
}
