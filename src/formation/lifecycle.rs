//! Cleanup rules applied at the start of every tick
//!
//! Referenced agents may die or be dropped between ticks. Pruning is
//! decided here and carried out by the registry through the same path as
//! an explicit removal, so leader promotion and events stay consistent.

use smallvec::SmallVec;

use crate::formation::agent::AgentId;
use crate::formation::constants::registry::MIN_MEMBERS;
use crate::formation::state::Formation;

/// Members that failed their validity check, in membership order
pub fn invalid_members(formation: &Formation) -> SmallVec<[AgentId; 4]> {
    formation
        .members()
        .iter()
        .filter(|m| !m.is_valid())
        .map(|m| m.id())
        .collect()
}

/// A formation below the minimum size has no cohesion purpose
#[inline]
pub fn is_degenerate(formation: &Formation) -> bool {
    formation.member_count() < MIN_MEMBERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::agent::{Agent, AgentHandle};
    use crate::formation::pattern::FormationType;
    use crate::formation::state::FormationId;
    use crate::sim::SimulatedAgent;
    use crate::util::vec3::Vec3;

    #[test]
    fn test_invalid_members_found_in_order() {
        let sims: Vec<_> = (0..4).map(|i| SimulatedAgent::spawn(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let handles: Vec<AgentHandle> = sims.iter().map(|s| s.clone() as AgentHandle).collect();
        let mut formation = Formation::new(FormationId(1), FormationType::Line, &handles[0]);
        for h in &handles[1..] {
            formation.push_member(h);
        }

        sims[3].kill();
        sims[1].kill();

        let invalid = invalid_members(&formation);
        assert_eq!(invalid.as_slice(), &[sims[1].id(), sims[3].id()]);
        assert_eq!(formation.member_count() - invalid.len(), 2);
    }

    #[test]
    fn test_dropped_agent_is_invalid() {
        let leader: AgentHandle = SimulatedAgent::spawn(Vec3::ZERO);
        let follower: AgentHandle = SimulatedAgent::spawn(Vec3::ZERO);
        let follower_id = follower.id();
        let mut formation = Formation::new(FormationId(1), FormationType::Column, &leader);
        formation.push_member(&follower);
        drop(follower);

        assert_eq!(invalid_members(&formation).as_slice(), &[follower_id]);
    }

    #[test]
    fn test_degenerate_below_two() {
        let leader: AgentHandle = SimulatedAgent::spawn(Vec3::ZERO);
        let mut formation = Formation::new(FormationId(1), FormationType::Line, &leader);
        assert!(is_degenerate(&formation));

        let other: AgentHandle = SimulatedAgent::spawn(Vec3::ZERO);
        formation.push_member(&other);
        assert!(!is_degenerate(&formation));
    }
}
