//! Core types for agent management

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Escalation tier of an agent
///
/// Calls go to the least escalated tier that has someone free. The ordering
/// is carried by [`AgentRole::priority`], not by declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Operator,
    Supervisor,
    Director,
}

impl AgentRole {
    /// Routing preference; lower values are selected first
    pub fn priority(self) -> u8 {
        match self {
            AgentRole::Operator => 1,
            AgentRole::Supervisor => 2,
            AgentRole::Director => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Operator => "operator",
            AgentRole::Supervisor => "supervisor",
            AgentRole::Director => "director",
        }
    }

    /// All roles from least to most escalated
    pub fn escalation_order() -> [AgentRole; 3] {
        let mut roles = [AgentRole::Director, AgentRole::Supervisor, AgentRole::Operator];
        roles.sort_by_key(|role| role.priority());
        roles
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "operator" | "Operator" | "OPERATOR" => Ok(AgentRole::Operator),
            "supervisor" | "Supervisor" | "SUPERVISOR" => Ok(AgentRole::Supervisor),
            "director" | "Director" | "DIRECTOR" => Ok(AgentRole::Director),
            _ => Err(format!("Unknown agent role: {}", s)),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Agent is free to take a call
    Available,

    /// Agent is handling a call
    Busy,
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "available" | "Available" | "AVAILABLE" => Ok(AgentStatus::Available),
            "busy" | "Busy" | "BUSY" => Ok(AgentStatus::Busy),
            _ => Err(format!("Unknown agent status: {}", s)),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Available => write!(f, "available"),
            AgentStatus::Busy => write!(f, "busy"),
        }
    }
}

/// Agent identifier type for strongly-typed agent references
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Generate a fresh identifier prefixed with the role name
    pub fn generate(role: AgentRole) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        AgentId(format!("{}-{}", role.as_str(), &suffix[..8]))
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_prefers_least_escalated() {
        assert_eq!(AgentRole::Operator.priority(), 1);
        assert_eq!(AgentRole::Supervisor.priority(), 2);
        assert_eq!(AgentRole::Director.priority(), 3);
        assert_eq!(
            AgentRole::escalation_order(),
            [AgentRole::Operator, AgentRole::Supervisor, AgentRole::Director]
        );
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("supervisor".parse::<AgentRole>(), Ok(AgentRole::Supervisor));
        assert_eq!("DIRECTOR".parse::<AgentRole>(), Ok(AgentRole::Director));
        assert!("manager".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_status_round_trips_through_display() {
        for status in [AgentStatus::Available, AgentStatus::Busy] {
            assert_eq!(status.to_string().parse::<AgentStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_generated_ids_carry_role() {
        let id = AgentId::generate(AgentRole::Operator);
        assert!(id.as_ref().starts_with("operator-"));
        assert_ne!(id, AgentId::generate(AgentRole::Operator));
    }
}
