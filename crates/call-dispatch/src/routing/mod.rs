//! # Call Routing Module
//!
//! This module holds the routing policy of the call center: which agent gets
//! the next pending call. The policy prefers the least escalated tier that
//! has somebody free, and only escalates when a whole tier is occupied.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Pending call                             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                  Agent selection                            │
//! │  - keep agents accepting work (Available, nothing queued)   │
//! │  - pick the lowest priority value                           │
//! │  - ties go to the earliest agent in the roster              │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!           ┌───────────────┼───────────────┐
//!           │               │               │
//! ┌─────────▼─────────┐ ┌───▼────────┐ ┌────▼───────┐
//! │ Operator (1)      │ │ Supervisor │ │ Director   │
//! │                   │ │ (2)        │ │ (3)        │
//! │ first choice      │ │ operators  │ │ nobody     │
//! │                   │ │ all busy   │ │ else free  │
//! └───────────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use call_dispatch::agent::{Agent, AgentRole};
//! use call_dispatch::routing::select_available_agent;
//!
//! let roster = vec![
//!     Arc::new(Agent::director()),
//!     Arc::new(Agent::supervisor()),
//!     Arc::new(Agent::operator()),
//! ];
//!
//! let chosen = select_available_agent(&roster).expect("everyone is free");
//! assert_eq!(chosen.role(), AgentRole::Operator);
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::agent::{Agent, AgentId, AgentRole};
use crate::call::CallId;

/// Pick the least escalated agent that is accepting work
///
/// Returns `None` when every agent is busy, has work queued, or has shut
/// down. Among agents of the same priority the earliest in `roster` wins.
pub fn select_available_agent(roster: &[Arc<Agent>]) -> Option<Arc<Agent>> {
    let free: Vec<&Arc<Agent>> = roster.iter().filter(|agent| agent.is_accepting_work()).collect();

    let Some(chosen) = free.iter().min_by_key(|agent| agent.priority()) else {
        debug!("No agent available");
        return None;
    };

    debug!(available = free.len(), "Agents available");
    match chosen.role() {
        AgentRole::Operator => {}
        AgentRole::Supervisor => debug!("No operator available, escalating to supervisor"),
        AgentRole::Director => debug!("No supervisor available, escalating to director"),
    }
    debug!(agent_id = %chosen.id(), role = %chosen.role(), "Agent selected");

    Some(Arc::clone(*chosen))
}

/// Result of a single routing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// A pending call was handed to an agent
    Assigned { call_id: CallId, agent_id: AgentId },

    /// The handoff failed and the call went back to the head of the queue
    Requeued { call_id: CallId, attempts: u32 },

    /// The handoff failed and the call ran out of attempts
    Parked { call_id: CallId, attempts: u32 },

    /// Calls are waiting but nobody is free
    NoAgentAvailable,

    /// Nothing is waiting
    Idle,
}

impl RoutingOutcome {
    /// Whether the routing loop should try again without waiting for a signal
    pub fn made_progress(&self) -> bool {
        matches!(self, RoutingOutcome::Assigned { .. } | RoutingOutcome::Parked { .. })
    }
}

impl fmt::Display for RoutingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingOutcome::Assigned { call_id, agent_id } => {
                write!(f, "call {} assigned to {}", call_id, agent_id)
            }
            RoutingOutcome::Requeued { call_id, attempts } => {
                write!(f, "call {} requeued after {} failed attempts", call_id, attempts)
            }
            RoutingOutcome::Parked { call_id, attempts } => {
                write!(f, "call {} parked after {} failed attempts", call_id, attempts)
            }
            RoutingOutcome::NoAgentAvailable => write!(f, "no agent available"),
            RoutingOutcome::Idle => write!(f, "no pending calls"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;

    fn roster(roles: &[AgentRole]) -> Vec<Arc<Agent>> {
        roles.iter().map(|role| Arc::new(Agent::new(*role))).collect()
    }

    fn occupy(agent: &Agent) {
        agent.assign(Call::new(1).unwrap()).unwrap();
    }

    #[test]
    fn test_operator_preferred_over_higher_tiers() {
        let agents = roster(&[AgentRole::Director, AgentRole::Supervisor, AgentRole::Operator]);
        let chosen = select_available_agent(&agents).unwrap();
        assert_eq!(chosen.role(), AgentRole::Operator);
        assert!(Arc::ptr_eq(&chosen, &agents[2]));
    }

    #[test]
    fn test_escalates_to_supervisor_before_director() {
        let agents = roster(&[AgentRole::Operator, AgentRole::Director, AgentRole::Supervisor]);
        occupy(&agents[0]);

        let chosen = select_available_agent(&agents).unwrap();
        assert_eq!(chosen.role(), AgentRole::Supervisor);
    }

    #[test]
    fn test_escalates_to_director_last() {
        let agents = roster(&[AgentRole::Operator, AgentRole::Supervisor, AgentRole::Director]);
        occupy(&agents[0]);
        occupy(&agents[1]);

        let chosen = select_available_agent(&agents).unwrap();
        assert_eq!(chosen.role(), AgentRole::Director);
    }

    #[test]
    fn test_ties_broken_by_roster_order() {
        let agents = roster(&[AgentRole::Supervisor, AgentRole::Operator, AgentRole::Operator]);
        let chosen = select_available_agent(&agents).unwrap();
        assert!(Arc::ptr_eq(&chosen, &agents[1]));

        occupy(&agents[1]);
        let chosen = select_available_agent(&agents).unwrap();
        assert!(Arc::ptr_eq(&chosen, &agents[2]));
    }

    #[test]
    fn test_none_when_everyone_occupied() {
        let agents = roster(&[AgentRole::Operator, AgentRole::Director]);
        agents.iter().for_each(|agent| occupy(agent));
        assert!(select_available_agent(&agents).is_none());
    }

    #[test]
    fn test_progress_classification() {
        let call_id = CallId::new();
        assert!(RoutingOutcome::Assigned { call_id, agent_id: "op".into() }.made_progress());
        assert!(RoutingOutcome::Parked { call_id, attempts: 3 }.made_progress());
        assert!(!RoutingOutcome::Requeued { call_id, attempts: 1 }.made_progress());
        assert!(!RoutingOutcome::NoAgentAvailable.made_progress());
        assert!(!RoutingOutcome::Idle.made_progress());
    }
}
