//! # Call Center Orchestration Module
//!
//! This module ties agents and routing together. The [`Dispatcher`] owns the
//! roster and the pending call queue, runs the routing loop, and manages the
//! lifecycle of every task it launches.
//!
//! ## Module Organization
//!
//! - **[`dispatcher`]**: `Dispatcher`, its builder, routing steps and stats
//! - **[`pending`]**: FIFO pending queue with retry preemption at the head
//! - **[`lifecycle`]**: `start`, `stop` and `shutdown`
//!
//! ## Task Layout
//!
//! ```text
//!   producers ──dispatch_call──▶ pending queue
//!                                     │
//!                               routing loop ◀──── "agent available" signal
//!                                     │ claim                 ▲
//!                ┌────────────────────┼────────────────────┐  │
//!                ▼                    ▼                    ▼  │
//!          agent loop           agent loop           agent loop
//! ```
//!
//! One cancellation token is shared by the routing loop and every agent
//! loop; `stop` cancels it and all of them wind down.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use call_dispatch::{Agent, Call, Dispatcher, DispatchConfig, RosterConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig { time_unit_ms: 10, ..Default::default() };
//! let dispatcher = Arc::new(Dispatcher::with_config(
//!     Agent::roster(&RosterConfig::default()),
//!     config,
//! )?);
//! dispatcher.start()?;
//!
//! for _ in 0..10 {
//!     dispatcher.dispatch_call(Call::random_between(5, 10)?);
//! }
//! dispatcher.wait_for_completions(10, Duration::from_secs(10)).await?;
//!
//! let stats = dispatcher.stats();
//! println!("📊 {} calls completed", stats.completed_calls);
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod lifecycle;
pub mod pending;

pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherStats};
pub use pending::{PendingCall, PendingQueue};
