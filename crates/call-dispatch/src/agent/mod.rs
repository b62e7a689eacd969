//! # Agent Module
//!
//! Agents are the workers of the call center. Each agent has a role that
//! fixes its routing priority, a status that flips between `Available` and
//! `Busy`, an inbound queue written by the dispatcher, and a log of the calls
//! it has finished.
//!
//! ```text
//!              claim / assign
//!  Dispatcher ────────────────▶ inbound queue ──▶ processing loop ──▶ completed log
//!                                                   │
//!                                   Available ◀─────┴────▶ Busy
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use call_dispatch::agent::{Agent, AgentStatus, ProcessingContext};
//! use call_dispatch::Call;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let agent = Arc::new(Agent::operator());
//! let cancel = CancellationToken::new();
//! let ctx = ProcessingContext::new(Duration::from_millis(10), cancel.clone());
//! let handle = tokio::spawn(agent.clone().run(ctx));
//!
//! agent.assign(Call::new(2)?)?;
//! tokio::time::sleep(Duration::from_millis(100)).await;
//! assert_eq!(agent.status(), AgentStatus::Available);
//! assert_eq!(agent.completed_count(), 1);
//!
//! cancel.cancel();
//! handle.await??;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod worker;

pub use types::{AgentId, AgentRole, AgentStatus};
pub use worker::{Agent, ProcessingContext};
