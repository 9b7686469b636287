//! Agent contract consumed by the formation core
//!
//! Agents are owned elsewhere. Formations only hold weak references and
//! re-check validity every tick.

use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::util::vec3::Vec3;

/// Stable identity of an agent
pub type AgentId = Uuid;

/// Strong handle callers pass into the registry
pub type AgentHandle = Arc<dyn Agent>;

/// Minimal capability set a mobile unit exposes to formations
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn position(&self) -> Vec3;

    /// Agents without a velocity are left out of alignment averaging
    fn velocity(&self) -> Option<Vec3> {
        None
    }

    /// False once the agent is dead or otherwise unusable
    fn is_valid(&self) -> bool;

    /// Fire-and-forget movement command
    fn move_toward(&self, point: Vec3);
}

/// Non-owning member reference stored inside a formation
#[derive(Clone)]
pub struct MemberRef {
    id: AgentId,
    agent: Weak<dyn Agent>,
}

impl MemberRef {
    pub fn new(agent: &AgentHandle) -> Self {
        Self {
            id: agent.id(),
            agent: Arc::downgrade(agent),
        }
    }

    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Upgrade to a live agent; `None` when the owner dropped it
    pub fn get(&self) -> Option<AgentHandle> {
        self.agent.upgrade()
    }

    /// Live and reporting itself valid
    pub fn is_valid(&self) -> bool {
        self.get().map_or(false, |a| a.is_valid())
    }

    pub fn position(&self) -> Option<Vec3> {
        self.get().filter(|a| a.is_valid()).map(|a| a.position())
    }
}

impl std::fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberRef")
            .field("id", &self.id)
            .field("alive", &(self.agent.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedAgent;

    #[test]
    fn test_member_ref_tracks_validity() {
        let agent: AgentHandle = SimulatedAgent::spawn(Vec3::new(1.0, 0.0, 2.0));
        let member = MemberRef::new(&agent);

        assert_eq!(member.id(), agent.id());
        assert!(member.is_valid());
        assert_eq!(member.position(), Some(Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn test_member_ref_invalid_after_drop() {
        let agent: AgentHandle = SimulatedAgent::spawn(Vec3::ZERO);
        let member = MemberRef::new(&agent);
        drop(agent);

        assert!(!member.is_valid());
        assert!(member.get().is_none());
        assert!(member.position().is_none());
    }

    #[test]
    fn test_member_ref_invalid_when_killed() {
        let sim = SimulatedAgent::spawn(Vec3::ZERO);
        let agent: AgentHandle = sim.clone();
        let member = MemberRef::new(&agent);
        sim.kill();

        assert!(!member.is_valid());
        assert!(member.position().is_none());
    }
}
