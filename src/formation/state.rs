//! Formation entity: membership, leader, pattern parameters, motion order
//! and the derived world-space slots.
//!
//! The leader is always `members[0]`, so it lines up with pattern offset 0.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::formation::agent::{AgentHandle, AgentId, MemberRef};
use crate::formation::pattern::{self, FormationType};
use crate::util::vec3::Vec3;

/// Registry-assigned formation handle, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormationId(pub u64);

impl fmt::Display for FormationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "formation-{}", self.0)
    }
}

/// Opaque indicator handle owned by a visualization layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// What happened to the formation when a member left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Follower,
    LeaderPromoted(AgentId),
    /// No members remain
    Emptied,
}

#[derive(Debug)]
pub struct Formation {
    id: FormationId,
    formation_type: FormationType,
    leader: AgentId,
    members: Vec<MemberRef>,
    /// Leader-local offsets from the last pattern generation
    offsets: Vec<Vec3>,
    slot_positions: Vec<Vec3>,
    spacing: f32,
    rotation: f32,
    is_moving: bool,
    target_position: Option<Vec3>,
    /// Last known leader position
    anchor: Vec3,
    pattern_dirty: bool,
    visual: Option<VisualHandle>,
}

impl Formation {
    pub(crate) fn new(id: FormationId, formation_type: FormationType, leader: &AgentHandle) -> Self {
        Self {
            id,
            formation_type,
            leader: leader.id(),
            members: vec![MemberRef::new(leader)],
            offsets: Vec::new(),
            slot_positions: Vec::new(),
            spacing: formation_type.default_spacing(),
            rotation: 0.0,
            is_moving: false,
            target_position: None,
            anchor: leader.position(),
            pattern_dirty: true,
            visual: None,
        }
    }

    pub fn id(&self) -> FormationId {
        self.id
    }

    pub fn formation_type(&self) -> FormationType {
        self.formation_type
    }

    pub fn leader_id(&self) -> AgentId {
        self.leader
    }

    pub fn members(&self) -> &[MemberRef] {
        &self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.members.iter().map(|m| m.id())
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.index_of(agent_id).is_some()
    }

    pub fn index_of(&self, agent_id: AgentId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == agent_id)
    }

    /// World-space slots, parallel to `members()`
    pub fn slot_positions(&self) -> &[Vec3] {
        &self.slot_positions
    }

    pub fn slot_of(&self, agent_id: AgentId) -> Option<Vec3> {
        self.index_of(agent_id)
            .and_then(|i| self.slot_positions.get(i).copied())
    }

    pub fn offsets(&self) -> &[Vec3] {
        &self.offsets
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Latest move target; kept after arrival
    pub fn target_position(&self) -> Option<Vec3> {
        self.target_position
    }

    pub fn leader_position(&self) -> Vec3 {
        self.anchor
    }

    pub(crate) fn leader_ref(&self) -> Option<&MemberRef> {
        self.members.first()
    }

    /// Append a member; false if already present
    pub(crate) fn push_member(&mut self, agent: &AgentHandle) -> bool {
        if self.contains(agent.id()) {
            return false;
        }
        self.members.push(MemberRef::new(agent));
        self.pattern_dirty = true;
        true
    }

    /// Remove a member, promoting the first remaining member when the
    /// leader leaves. `None` if the agent was not a member.
    pub(crate) fn remove_member(&mut self, agent_id: AgentId) -> Option<Removal> {
        let index = self.index_of(agent_id)?;
        self.members.remove(index);
        self.pattern_dirty = true;

        let Some(next) = self.members.first() else {
            return Some(Removal::Emptied);
        };
        if agent_id != self.leader {
            return Some(Removal::Follower);
        }
        self.leader = next.id();
        if let Some(position) = next.position() {
            self.anchor = position;
        }
        Some(Removal::LeaderPromoted(self.leader))
    }

    /// Hand leadership to an existing member, moving it to slot 0
    pub(crate) fn set_leader(&mut self, agent_id: AgentId) -> bool {
        let Some(index) = self.index_of(agent_id) else {
            return false;
        };
        if index != 0 {
            let member = self.members.remove(index);
            self.members.insert(0, member);
            self.pattern_dirty = true;
        }
        self.leader = agent_id;
        true
    }

    pub(crate) fn set_type(&mut self, formation_type: FormationType) {
        self.formation_type = formation_type;
        self.spacing = formation_type.default_spacing();
        self.pattern_dirty = true;
    }

    pub(crate) fn set_spacing(&mut self, spacing: f32) {
        self.spacing = spacing;
        self.pattern_dirty = true;
    }

    pub(crate) fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    pub(crate) fn begin_move(&mut self, target: Vec3) {
        self.is_moving = true;
        self.target_position = Some(target);
    }

    pub(crate) fn end_move(&mut self) {
        self.is_moving = false;
    }

    /// True while moving and the leader is within `tolerance` of the target
    pub(crate) fn has_arrived(&self, tolerance: f32) -> bool {
        match (self.is_moving, self.target_position) {
            (true, Some(target)) => self.anchor.distance_to(target) <= tolerance,
            _ => false,
        }
    }

    pub(crate) fn set_visual(&mut self, handle: VisualHandle) -> Option<VisualHandle> {
        self.visual.replace(handle)
    }

    pub(crate) fn take_visual(&mut self) -> Option<VisualHandle> {
        self.visual.take()
    }

    /// Refresh the anchor from the live leader; keeps the last known
    /// position when the leader cannot be read
    pub(crate) fn refresh_anchor(&mut self) -> Vec3 {
        if let Some(position) = self.leader_ref().and_then(|l| l.position()) {
            self.anchor = position;
        }
        self.anchor
    }

    /// Regenerate offsets if the pattern changed, then rotate and translate
    /// them around the leader
    pub fn recompute_slots<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let anchor = self.refresh_anchor();
        let count = self.members.len();

        if self.pattern_dirty || self.offsets.len() != count {
            self.offsets = pattern::generate_with_rng(self.formation_type, count, self.spacing, rng);
            self.pattern_dirty = false;
        }

        self.slot_positions = pattern::place(&self.offsets, anchor, self.rotation);
        // Pin any member without a generated offset to the leader
        if self.slot_positions.len() < count {
            self.slot_positions.resize(count, anchor);
        }
        self.slot_positions.truncate(count);
    }
}
