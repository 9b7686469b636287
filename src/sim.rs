//! Reference agent used by the demo binary, benches and tests
//!
//! Two movement modes: instant agents jump straight to each commanded point,
//! speed-limited agents walk toward their latest command on `advance`.

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::formation::agent::{Agent, AgentId};
use crate::util::vec3::Vec3;

#[derive(Debug)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    target: Option<Vec3>,
    alive: bool,
    commands: u32,
}

/// Simple mobile unit backed by a mutex-guarded body
#[derive(Debug)]
pub struct SimulatedAgent {
    id: AgentId,
    /// `None` means commands are satisfied instantly
    speed: Option<f32>,
    body: Mutex<Body>,
}

impl SimulatedAgent {
    fn build(position: Vec3, speed: Option<f32>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            speed,
            body: Mutex::new(Body {
                position,
                velocity: Vec3::ZERO,
                target: None,
                alive: true,
                commands: 0,
            }),
        })
    }

    /// Agent that teleports to every commanded point
    pub fn spawn(position: Vec3) -> Arc<Self> {
        Self::build(position, None)
    }

    /// Agent that moves at most `speed` units per second toward its command
    pub fn with_speed(position: Vec3, speed: f32) -> Arc<Self> {
        Self::build(position, Some(speed.max(0.0)))
    }

    pub fn kill(&self) {
        self.body.lock().alive = false;
    }

    pub fn set_position(&self, position: Vec3) {
        self.body.lock().position = position;
    }

    /// Most recent point this agent was told to move toward
    pub fn last_command(&self) -> Option<Vec3> {
        self.body.lock().target
    }

    pub fn command_count(&self) -> u32 {
        self.body.lock().commands
    }

    /// Integrate speed-limited movement; instant agents ignore this
    pub fn advance(&self, dt: f32) {
        let Some(speed) = self.speed else {
            return;
        };
        let mut body = self.body.lock();
        if !body.alive {
            body.velocity = Vec3::ZERO;
            return;
        }
        let Some(target) = body.target else {
            body.velocity = Vec3::ZERO;
            return;
        };

        let (dir, dist) = (target - body.position).normalize_with_length();
        let step = (speed * dt).min(dist);
        body.velocity = if dt > 0.0 { dir * (step / dt) } else { Vec3::ZERO };
        body.position += dir * step;
        if step >= dist {
            body.target = None;
        }
    }
}

impl Agent for SimulatedAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.body.lock().position
    }

    fn velocity(&self) -> Option<Vec3> {
        // Instant movers have no meaningful velocity
        self.speed.map(|_| self.body.lock().velocity)
    }

    fn is_valid(&self) -> bool {
        self.body.lock().alive
    }

    fn move_toward(&self, point: Vec3) {
        let mut body = self.body.lock();
        if !body.alive {
            return;
        }
        body.commands += 1;
        body.target = Some(point);
        if self.speed.is_none() {
            body.position = point;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_agent_jumps() {
        let agent = SimulatedAgent::spawn(Vec3::ZERO);
        agent.move_toward(Vec3::new(5.0, 0.0, 5.0));

        assert_eq!(agent.position(), Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(agent.command_count(), 1);
        assert!(agent.velocity().is_none());
    }

    #[test]
    fn test_speed_limited_agent_walks() {
        let agent = SimulatedAgent::with_speed(Vec3::ZERO, 2.0);
        agent.move_toward(Vec3::new(10.0, 0.0, 0.0));
        agent.advance(1.0);

        assert!(agent.position().approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
        let velocity = agent.velocity().unwrap();
        assert!(velocity.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_speed_limited_agent_stops_at_target() {
        let agent = SimulatedAgent::with_speed(Vec3::ZERO, 100.0);
        agent.move_toward(Vec3::new(1.0, 0.0, 0.0));
        agent.advance(1.0);

        assert!(agent.position().approx_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(agent.last_command().is_none());
    }

    #[test]
    fn test_dead_agent_ignores_commands() {
        let agent = SimulatedAgent::spawn(Vec3::ZERO);
        agent.kill();
        agent.move_toward(Vec3::new(1.0, 0.0, 0.0));

        assert!(!agent.is_valid());
        assert_eq!(agent.position(), Vec3::ZERO);
        assert_eq!(agent.command_count(), 0);
    }
}
