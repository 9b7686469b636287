//! Formation registry
//!
//! Owns every active formation and the agent → formation reverse index,
//! allocates ids, and runs the per-tick cleanup / slot / steering pass.
//!
//! Failed operations never mutate state. Stale agents are expected in
//! this domain, so they are pruned on the next tick instead of surfacing
//! as errors.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use smallvec::SmallVec;
use std::f32::consts::TAU;
use tracing::{debug, info, trace, warn};

use crate::config::FormationConfig;
use crate::formation::agent::{AgentHandle, AgentId};
use crate::formation::events::{
    DisbandReason, EventBus, FormationChange, FormationEvent, LeaveReason,
};
use crate::formation::lifecycle;
use crate::formation::pattern::FormationType;
use crate::formation::state::{Formation, FormationId, Removal, VisualHandle};
use crate::formation::steering::{MemberSnapshot, SteeringModel};
use crate::util::vec3::Vec3;

/// Rejected registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormationError {
    #[error("Formation {0} not found")]
    FormationNotFound(FormationId),
    #[error("Agent {0} is not valid")]
    InvalidAgent(AgentId),
    #[error("Agent {agent} is not a member of {formation}")]
    NotAMember { agent: AgentId, formation: FormationId },
    #[error("Invalid spacing {0}")]
    InvalidSpacing(f32),
    #[error("Invalid rotation {0}")]
    InvalidRotation(f32),
    #[error("Invalid move target")]
    InvalidTarget,
}

/// Descriptive snapshot of one formation
#[derive(Debug, Clone, Serialize)]
pub struct FormationInfo {
    pub id: FormationId,
    pub formation_type: FormationType,
    pub name: &'static str,
    pub description: &'static str,
    pub member_count: usize,
    pub leader_id: AgentId,
    pub spacing: f32,
    pub rotation: f32,
    pub is_moving: bool,
    pub target_position: Option<Vec3>,
    pub advantages: Vec<&'static str>,
    pub disadvantages: Vec<&'static str>,
}

/// Aggregate counts across all active formations
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormationStats {
    pub active_count: usize,
    pub total_members: usize,
    pub counts_by_type: HashMap<FormationType, usize>,
    pub average_size: f32,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub formations_processed: usize,
    pub commands_issued: usize,
    pub members_pruned: usize,
    pub disbanded: usize,
    pub arrivals: usize,
}

pub struct FormationRegistry {
    formations: HashMap<FormationId, Formation>,
    agent_formations: HashMap<AgentId, FormationId>,
    next_id: u64,
    config: FormationConfig,
    steering: SteeringModel,
    /// Random source for scattered layouts
    rng: StdRng,
    events: EventBus,
}

impl FormationRegistry {
    pub fn new(config: FormationConfig) -> Self {
        let rng = match config.scatter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            formations: HashMap::new(),
            agent_formations: HashMap::new(),
            next_id: 1,
            steering: SteeringModel::new(config.steering),
            config,
            rng,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &FormationConfig {
        &self.config
    }

    /// Receive every notification published from now on
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<FormationEvent> {
        self.events.subscribe()
    }

    /// Create a formation led by `leader`. Invalid or duplicate extras are
    /// skipped; agents already in another formation leave it first.
    pub fn create_formation(
        &mut self,
        formation_type: FormationType,
        leader: &AgentHandle,
        extra_members: &[AgentHandle],
    ) -> Result<FormationId, FormationError> {
        if !leader.is_valid() {
            warn!(agent = %leader.id(), "Rejected formation with invalid leader");
            return Err(FormationError::InvalidAgent(leader.id()));
        }

        self.detach(leader.id(), LeaveReason::Transferred);

        let id = FormationId(self.next_id);
        self.next_id += 1;

        self.formations
            .insert(id, Formation::new(id, formation_type, leader));
        self.agent_formations.insert(leader.id(), id);

        for agent in extra_members {
            let agent_id = agent.id();
            if !agent.is_valid() {
                debug!(formation = %id, agent = %agent_id, "Skipping invalid member");
                continue;
            }
            if self.agent_formations.get(&agent_id) == Some(&id) {
                continue;
            }
            self.detach(agent_id, LeaveReason::Transferred);
            if let Some(formation) = self.formations.get_mut(&id) {
                formation.push_member(agent);
                self.agent_formations.insert(agent_id, id);
            }
        }

        let Some(formation) = self.formations.get_mut(&id) else {
            return Err(FormationError::FormationNotFound(id));
        };
        formation.recompute_slots(&mut self.rng);
        let member_count = formation.member_count();

        info!(
            formation = %id,
            formation_type = %formation_type,
            members = member_count,
            "Formation created"
        );
        self.events.publish(FormationEvent::Created {
            formation_id: id,
            formation_type,
            leader: leader.id(),
            member_count,
        });

        Ok(id)
    }

    /// Remove a formation and release every member
    pub fn disband_formation(&mut self, id: FormationId) -> Result<(), FormationError> {
        self.disband_with(id, DisbandReason::Requested).map(|_| ())
    }

    /// Disband everything; called on teardown
    pub fn shutdown(&mut self) {
        let ids = self.list_formations();
        for id in ids {
            let _ = self.disband_with(id, DisbandReason::RegistryShutdown);
        }
        self.agent_formations.clear();
    }

    fn disband_with(
        &mut self,
        id: FormationId,
        reason: DisbandReason,
    ) -> Result<Formation, FormationError> {
        let mut formation = self
            .formations
            .remove(&id)
            .ok_or(FormationError::FormationNotFound(id))?;

        for agent_id in formation.member_ids() {
            if self.agent_formations.get(&agent_id) == Some(&id) {
                self.agent_formations.remove(&agent_id);
            }
        }
        let visual = formation.take_visual();

        info!(formation = %id, ?reason, "Formation disbanded");
        self.events.publish(FormationEvent::Disbanded {
            formation_id: id,
            reason,
            visual,
        });

        Ok(formation)
    }

    /// Add `agent` to formation `id`, leaving any previous formation
    pub fn add_member(&mut self, agent: &AgentHandle, id: FormationId) -> Result<(), FormationError> {
        if !self.formations.contains_key(&id) {
            return Err(FormationError::FormationNotFound(id));
        }
        let agent_id = agent.id();
        if !agent.is_valid() {
            return Err(FormationError::InvalidAgent(agent_id));
        }
        if self.agent_formations.get(&agent_id) == Some(&id) {
            return Ok(());
        }

        self.detach(agent_id, LeaveReason::Transferred);

        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        formation.push_member(agent);
        formation.recompute_slots(&mut self.rng);
        self.agent_formations.insert(agent_id, id);

        debug!(formation = %id, agent = %agent_id, "Member joined");
        self.events.publish(FormationEvent::MemberJoined {
            formation_id: id,
            agent_id,
        });
        Ok(())
    }

    /// Remove `agent_id` from formation `id`. Removing the leader promotes
    /// the first remaining member; removing the last member disbands.
    pub fn remove_member(&mut self, agent_id: AgentId, id: FormationId) -> Result<(), FormationError> {
        self.remove_with(agent_id, id, LeaveReason::Removed)
    }

    /// Leave whatever formation the agent is in, if any
    fn detach(&mut self, agent_id: AgentId, reason: LeaveReason) {
        if let Some(&previous) = self.agent_formations.get(&agent_id) {
            let _ = self.remove_with(agent_id, previous, reason);
        }
    }

    fn remove_with(
        &mut self,
        agent_id: AgentId,
        id: FormationId,
        reason: LeaveReason,
    ) -> Result<(), FormationError> {
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        let removal = formation
            .remove_member(agent_id)
            .ok_or(FormationError::NotAMember {
                agent: agent_id,
                formation: id,
            })?;

        if removal != Removal::Emptied {
            formation.recompute_slots(&mut self.rng);
        }
        if self.agent_formations.get(&agent_id) == Some(&id) {
            self.agent_formations.remove(&agent_id);
        }

        debug!(formation = %id, agent = %agent_id, ?reason, "Member left");
        self.events.publish(FormationEvent::MemberLeft {
            formation_id: id,
            agent_id,
            reason,
        });

        match removal {
            Removal::Follower => {}
            Removal::LeaderPromoted(leader) => {
                debug!(formation = %id, leader = %leader, "Leader promoted");
                self.events.publish(FormationEvent::LeaderChanged {
                    formation_id: id,
                    previous: agent_id,
                    leader,
                });
            }
            Removal::Emptied => {
                self.disband_with(id, DisbandReason::Empty)?;
            }
        }
        Ok(())
    }

    /// Hand leadership to an existing member
    pub fn set_leader(&mut self, id: FormationId, agent_id: AgentId) -> Result<(), FormationError> {
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        let previous = formation.leader_id();
        if previous == agent_id {
            return Ok(());
        }
        if !formation.set_leader(agent_id) {
            return Err(FormationError::NotAMember {
                agent: agent_id,
                formation: id,
            });
        }
        formation.recompute_slots(&mut self.rng);

        self.events.publish(FormationEvent::LeaderChanged {
            formation_id: id,
            previous,
            leader: agent_id,
        });
        Ok(())
    }

    /// Order the formation toward `target`; replaces any previous order
    pub fn move_formation(&mut self, id: FormationId, target: Vec3) -> Result<(), FormationError> {
        if !target.is_finite() {
            return Err(FormationError::InvalidTarget);
        }
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        formation.begin_move(target);

        debug!(formation = %id, ?target, "Move started");
        self.events.publish(FormationEvent::MoveStarted {
            formation_id: id,
            target,
        });
        Ok(())
    }

    /// Cancel an active move order without disbanding
    pub fn stop_formation(&mut self, id: FormationId) -> Result<(), FormationError> {
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        if formation.is_moving() {
            formation.end_move();
            self.events
                .publish(FormationEvent::MoveCancelled { formation_id: id });
        }
        Ok(())
    }

    /// Change the pattern; spacing resets to the new type's default
    pub fn set_formation_type(
        &mut self,
        id: FormationId,
        formation_type: FormationType,
    ) -> Result<(), FormationError> {
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        let from = formation.formation_type();
        formation.set_type(formation_type);
        formation.recompute_slots(&mut self.rng);

        debug!(formation = %id, %from, to = %formation_type, "Formation type changed");
        self.publish_update(
            id,
            FormationChange::TypeChanged {
                from,
                to: formation_type,
            },
        );
        Ok(())
    }

    /// Override spacing; values below the configured minimum (zero and
    /// negatives included) are raised to it. Returns the spacing applied.
    pub fn set_spacing(&mut self, id: FormationId, spacing: f32) -> Result<f32, FormationError> {
        if !spacing.is_finite() {
            return Err(FormationError::InvalidSpacing(spacing));
        }
        let min_spacing = self.config.min_spacing;
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        let applied = spacing.max(min_spacing);
        formation.set_spacing(applied);
        formation.recompute_slots(&mut self.rng);

        debug!(formation = %id, spacing = applied, "Spacing changed");
        self.publish_update(id, FormationChange::SpacingChanged { spacing: applied });
        Ok(applied)
    }

    /// Orientation about the vertical axis, normalized to [0, 2π)
    pub fn set_rotation(&mut self, id: FormationId, radians: f32) -> Result<(), FormationError> {
        if !radians.is_finite() {
            return Err(FormationError::InvalidRotation(radians));
        }
        let formation = self
            .formations
            .get_mut(&id)
            .ok_or(FormationError::FormationNotFound(id))?;
        let rotation = radians.rem_euclid(TAU);
        formation.set_rotation(rotation);
        formation.recompute_slots(&mut self.rng);

        debug!(formation = %id, rotation, "Rotation changed");
        self.publish_update(id, FormationChange::RotationChanged { rotation });
        Ok(())
    }

    /// Associate a visualization handle; returns the handle it replaced
    pub fn attach_visual(
        &mut self,
        id: FormationId,
        handle: VisualHandle,
    ) -> Result<Option<VisualHandle>, FormationError> {
        self.formations
            .get_mut(&id)
            .map(|f| f.set_visual(handle))
            .ok_or(FormationError::FormationNotFound(id))
    }

    fn publish_update(&mut self, id: FormationId, change: FormationChange) {
        self.events.publish(FormationEvent::Updated {
            formation_id: id,
            change,
        });
    }

    pub fn get_formation(&self, id: FormationId) -> Option<&Formation> {
        self.formations.get(&id)
    }

    pub fn get_formation_of(&self, agent_id: AgentId) -> Option<FormationId> {
        self.agent_formations.get(&agent_id).copied()
    }

    /// Active formation ids in creation order
    pub fn list_formations(&self) -> Vec<FormationId> {
        let mut ids: Vec<FormationId> = self.formations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn formation_count(&self) -> usize {
        self.formations.len()
    }

    pub fn get_formation_info(&self, id: FormationId) -> Option<FormationInfo> {
        let formation = self.formations.get(&id)?;
        let template = formation.formation_type().template();
        Some(FormationInfo {
            id,
            formation_type: formation.formation_type(),
            name: template.name,
            description: template.description,
            member_count: formation.member_count(),
            leader_id: formation.leader_id(),
            spacing: formation.spacing(),
            rotation: formation.rotation(),
            is_moving: formation.is_moving(),
            target_position: formation.target_position(),
            advantages: template.advantages.to_vec(),
            disadvantages: template.disadvantages.to_vec(),
        })
    }

    pub fn get_statistics(&self) -> FormationStats {
        let mut stats = FormationStats {
            active_count: self.formations.len(),
            ..Default::default()
        };
        for formation in self.formations.values() {
            stats.total_members += formation.member_count();
            *stats
                .counts_by_type
                .entry(formation.formation_type())
                .or_insert(0) += 1;
        }
        if stats.active_count > 0 {
            stats.average_size = stats.total_members as f32 / stats.active_count as f32;
        }
        stats
    }

    /// Advance every formation by `dt` seconds: prune invalid members,
    /// disband undersized formations, refresh slots, settle arrivals and
    /// issue one move command per member that needs correcting.
    pub fn tick(&mut self, dt: f32) -> TickSummary {
        let mut summary = TickSummary::default();
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "Ignoring tick with invalid delta");
            return summary;
        }

        for id in self.list_formations() {
            let Some(formation) = self.formations.get(&id) else {
                continue;
            };

            for agent_id in lifecycle::invalid_members(formation) {
                if self.remove_with(agent_id, id, LeaveReason::Pruned).is_ok() {
                    summary.members_pruned += 1;
                }
            }

            let Some(formation) = self.formations.get(&id) else {
                summary.disbanded += 1;
                continue;
            };
            if lifecycle::is_degenerate(formation) {
                if self.disband_with(id, DisbandReason::TooFewMembers).is_ok() {
                    summary.disbanded += 1;
                }
                continue;
            }

            summary.formations_processed += 1;
            self.step_formation(id, dt, &mut summary);
        }

        trace!(
            processed = summary.formations_processed,
            commands = summary.commands_issued,
            pruned = summary.members_pruned,
            disbanded = summary.disbanded,
            "Formation tick"
        );
        summary
    }

    fn step_formation(&mut self, id: FormationId, dt: f32, summary: &mut TickSummary) {
        let tolerance = self.config.arrival_tolerance;
        let parallel_threshold = self.config.parallel_threshold;
        let Some(formation) = self.formations.get_mut(&id) else {
            return;
        };

        formation.recompute_slots(&mut self.rng);

        if formation.has_arrived(tolerance) {
            formation.end_move();
            let position = formation.leader_position();
            summary.arrivals += 1;
            debug!(formation = %id, ?position, "Move completed");
            self.events.publish(FormationEvent::MoveCompleted {
                formation_id: id,
                position,
            });
        }

        let Some(formation) = self.formations.get(&id) else {
            return;
        };
        let anchor = formation.leader_position();

        let handles: SmallVec<[Option<AgentHandle>; 16]> =
            formation.members().iter().map(|m| m.get()).collect();
        let snapshots: SmallVec<[MemberSnapshot; 16]> = handles
            .iter()
            .map(|handle| match handle {
                Some(agent) => MemberSnapshot::new(agent.position(), agent.velocity()),
                None => MemberSnapshot::new(anchor, None),
            })
            .collect();

        let parallel = snapshots.len() >= parallel_threshold;
        let forces = self.steering.compute_forces(
            &snapshots,
            formation.slot_positions(),
            Some(0),
            parallel,
        );

        if formation.is_moving() {
            if let (Some(Some(leader)), Some(target)) = (handles.first(), formation.target_position()) {
                leader.move_toward(target);
                summary.commands_issued += 1;
            }
        }

        for ((handle, snapshot), force) in handles.iter().zip(&snapshots).zip(forces) {
            let (Some(agent), Some(force)) = (handle, force) else {
                continue;
            };
            agent.move_toward(snapshot.position + force * dt);
            summary.commands_issued += 1;
        }
    }
}

impl Default for FormationRegistry {
    fn default() -> Self {
        Self::new(FormationConfig::default())
    }
}

impl Drop for FormationRegistry {
    fn drop(&mut self) {
        if !self.formations.is_empty() {
            self.shutdown();
        }
    }
}
