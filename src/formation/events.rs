//! Formation notifications
//!
//! Listeners subscribe for a crossbeam receiver and drain it at their own
//! pace; publishing never blocks the tick.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

use crate::formation::agent::AgentId;
use crate::formation::pattern::FormationType;
use crate::formation::state::{FormationId, VisualHandle};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisbandReason {
    /// Explicit `disband_formation` call
    Requested,
    /// Fewer than two valid members at tick time
    TooFewMembers,
    /// Last member removed
    Empty,
    RegistryShutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeaveReason {
    /// Explicit `remove_member` call
    Removed,
    /// Failed its validity check during a tick
    Pruned,
    /// Joined another formation
    Transferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FormationChange {
    TypeChanged { from: FormationType, to: FormationType },
    SpacingChanged { spacing: f32 },
    RotationChanged { rotation: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FormationEvent {
    Created {
        formation_id: FormationId,
        formation_type: FormationType,
        leader: AgentId,
        member_count: usize,
    },
    Disbanded {
        formation_id: FormationId,
        reason: DisbandReason,
        /// Indicator the visualization layer should release
        visual: Option<VisualHandle>,
    },
    Updated {
        formation_id: FormationId,
        change: FormationChange,
    },
    MemberJoined {
        formation_id: FormationId,
        agent_id: AgentId,
    },
    MemberLeft {
        formation_id: FormationId,
        agent_id: AgentId,
        reason: LeaveReason,
    },
    LeaderChanged {
        formation_id: FormationId,
        previous: AgentId,
        leader: AgentId,
    },
    MoveStarted {
        formation_id: FormationId,
        target: Vec3,
    },
    MoveCompleted {
        formation_id: FormationId,
        position: Vec3,
    },
    MoveCancelled {
        formation_id: FormationId,
    },
}

impl FormationEvent {
    pub fn formation_id(&self) -> FormationId {
        match self {
            FormationEvent::Created { formation_id, .. }
            | FormationEvent::Disbanded { formation_id, .. }
            | FormationEvent::Updated { formation_id, .. }
            | FormationEvent::MemberJoined { formation_id, .. }
            | FormationEvent::MemberLeft { formation_id, .. }
            | FormationEvent::LeaderChanged { formation_id, .. }
            | FormationEvent::MoveStarted { formation_id, .. }
            | FormationEvent::MoveCompleted { formation_id, .. }
            | FormationEvent::MoveCancelled { formation_id } => *formation_id,
        }
    }
}

/// Fan-out of events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<FormationEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<FormationEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Deliver to every live subscriber, dropping disconnected ones
    pub fn publish(&mut self, event: FormationEvent) {
        tracing::trace!(formation = %event.formation_id(), ?event, "formation event");
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancelled(id: u64) -> FormationEvent {
        FormationEvent::MoveCancelled {
            formation_id: FormationId(id),
        }
    }

    #[test]
    fn test_every_subscriber_receives() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(cancelled(1));

        assert_eq!(a.try_recv().unwrap(), cancelled(1));
        assert_eq!(b.try_recv().unwrap(), cancelled(1));
    }

    #[test]
    fn test_disconnected_subscribers_dropped() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.publish(cancelled(2));

        assert_eq!(bus.subscribers.len(), 1);
        assert_eq!(kept.try_iter().count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let mut bus = EventBus::new();
        bus.publish(cancelled(3));
        assert!(bus.subscribers.is_empty());
    }

    #[test]
    fn test_formation_id_accessor() {
        let event = FormationEvent::MoveStarted {
            formation_id: FormationId(9),
            target: Vec3::ZERO,
        };
        assert_eq!(event.formation_id(), FormationId(9));
    }

    #[test]
    fn test_event_serializes() {
        let event = FormationEvent::Disbanded {
            formation_id: FormationId(4),
            reason: DisbandReason::TooFewMembers,
            visual: Some(VisualHandle(11)),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TooFewMembers"));
    }
}
