//! Per-member corrective force: cohesion toward the assigned slot,
//! separation from crowding formation-mates, and velocity alignment.
//!
//! Cost is O(n²) per formation because separation and alignment look at
//! every other member. Fine at squad scale; large formations are spread
//! over rayon once they pass the configured threshold.

use rayon::prelude::*;

use crate::formation::constants::steering::*;
use crate::util::vec3::Vec3;

/// Strength scalars and distance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    pub cohesion_strength: f32,
    pub separation_strength: f32,
    pub alignment_strength: f32,
    pub slot_tolerance: f32,
    pub max_cohesion_distance: f32,
    pub min_separation: f32,
    pub min_force: f32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            cohesion_strength: DEFAULT_COHESION_STRENGTH,
            separation_strength: DEFAULT_SEPARATION_STRENGTH,
            alignment_strength: DEFAULT_ALIGNMENT_STRENGTH,
            slot_tolerance: SLOT_TOLERANCE,
            max_cohesion_distance: MAX_COHESION_DISTANCE,
            min_separation: MIN_SEPARATION,
            min_force: MIN_FORCE,
        }
    }
}

/// Read-only view of one member for a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberSnapshot {
    pub position: Vec3,
    pub velocity: Option<Vec3>,
}

impl MemberSnapshot {
    pub fn new(position: Vec3, velocity: Option<Vec3>) -> Self {
        Self { position, velocity }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SteeringModel {
    params: SteeringParams,
}

impl SteeringModel {
    pub fn new(params: SteeringParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SteeringParams {
        &self.params
    }

    /// Pull toward the slot, capped in length; zero once inside tolerance
    pub fn cohesion(&self, position: Vec3, slot: Vec3) -> Vec3 {
        let to_slot = slot - position;
        if to_slot.length_sq() <= self.params.slot_tolerance * self.params.slot_tolerance {
            return Vec3::ZERO;
        }
        to_slot.clamp_length(self.params.max_cohesion_distance) * self.params.cohesion_strength
    }

    /// Push away from every other member closer than the minimum separation
    pub fn separation(&self, index: usize, members: &[MemberSnapshot]) -> Vec3 {
        let Some(me) = members.get(index) else {
            return Vec3::ZERO;
        };
        let min_distance = self.params.min_separation;

        members
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .filter_map(|(_, other)| {
                let (away, distance) = (me.position - other.position).normalize_with_length();
                // Coincident members have no defined push direction
                if distance <= 0.0 || distance >= min_distance {
                    return None;
                }
                Some(away * ((min_distance - distance) * self.params.separation_strength))
            })
            .sum()
    }

    /// Average velocity of the other members that report one
    pub fn alignment(&self, index: usize, members: &[MemberSnapshot]) -> Vec3 {
        let (sum, count) = members
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .filter_map(|(_, m)| m.velocity)
            .fold((Vec3::ZERO, 0usize), |(sum, n), v| (sum + v, n + 1));

        if count == 0 {
            return Vec3::ZERO;
        }
        sum / count as f32 * self.params.alignment_strength
    }

    /// cohesion + separation + alignment for member `index`
    pub fn steering_force(&self, index: usize, slot: Vec3, members: &[MemberSnapshot]) -> Vec3 {
        let Some(me) = members.get(index) else {
            return Vec3::ZERO;
        };
        self.cohesion(me.position, slot) + self.separation(index, members) + self.alignment(index, members)
    }

    /// Combined force, or `None` when it is too small to act on
    pub fn corrective_force(&self, index: usize, slot: Vec3, members: &[MemberSnapshot]) -> Option<Vec3> {
        let force = self.steering_force(index, slot, members);
        (force.length() >= self.params.min_force).then_some(force)
    }

    /// Forces for every member, skipping `anchor` (the leader).
    /// `slots` must be parallel to `members`.
    pub fn compute_forces(
        &self,
        members: &[MemberSnapshot],
        slots: &[Vec3],
        anchor: Option<usize>,
        parallel: bool,
    ) -> Vec<Option<Vec3>> {
        let force_for = |i: usize| -> Option<Vec3> {
            if Some(i) == anchor {
                return None;
            }
            let slot = slots.get(i).copied()?;
            self.corrective_force(i, slot, members)
        };

        if parallel {
            (0..members.len()).into_par_iter().map(force_for).collect()
        } else {
            (0..members.len()).map(force_for).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn still(x: f32, z: f32) -> MemberSnapshot {
        MemberSnapshot::new(Vec3::new(x, 0.0, z), None)
    }

    fn model() -> SteeringModel {
        SteeringModel::new(SteeringParams {
            cohesion_strength: 1.0,
            separation_strength: 1.0,
            alignment_strength: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_cohesion_points_at_slot() {
        let force = model().cohesion(Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0));
        assert!(force.approx_eq(Vec3::new(3.0, 0.0, 4.0), EPSILON));
    }

    #[test]
    fn test_cohesion_clamped() {
        let force = model().cohesion(Vec3::ZERO, Vec3::new(0.0, 0.0, 50.0));
        assert!((force.length() - MAX_COHESION_DISTANCE).abs() < EPSILON);
    }

    #[test]
    fn test_cohesion_zero_inside_tolerance() {
        let force = model().cohesion(Vec3::ZERO, Vec3::new(0.2, 0.0, 0.2));
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn test_cohesion_zero_just_inside_position_tolerance() {
        let force = model().cohesion(Vec3::ZERO, Vec3::new(0.8, 0.0, 0.0));
        assert_eq!(force, Vec3::ZERO);
        let force = model().cohesion(Vec3::ZERO, Vec3::new(1.2, 0.0, 0.0));
        assert!(force.approx_eq(Vec3::new(1.2, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_cohesion_scaled_by_strength() {
        let model = SteeringModel::new(SteeringParams {
            cohesion_strength: 0.5,
            ..Default::default()
        });
        let force = model.cohesion(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        assert!(force.approx_eq(Vec3::new(2.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_separation_pushes_apart() {
        let members = [still(0.0, 0.0), still(1.0, 0.0)];
        let force = model().separation(0, &members);
        // (3.0 - 1.0) * 1.0 along -x
        assert!(force.approx_eq(Vec3::new(-2.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_separation_ignores_distant_members() {
        let members = [still(0.0, 0.0), still(3.0, 0.0), still(0.0, 10.0)];
        assert_eq!(model().separation(0, &members), Vec3::ZERO);
    }

    #[test]
    fn test_separation_ignores_coincident_members() {
        let members = [still(1.0, 1.0), still(1.0, 1.0)];
        assert_eq!(model().separation(0, &members), Vec3::ZERO);
    }

    #[test]
    fn test_alignment_averages_others() {
        let members = [
            MemberSnapshot::new(Vec3::ZERO, Some(Vec3::new(100.0, 0.0, 0.0))),
            MemberSnapshot::new(Vec3::new(10.0, 0.0, 0.0), Some(Vec3::new(2.0, 0.0, 0.0))),
            MemberSnapshot::new(Vec3::new(20.0, 0.0, 0.0), Some(Vec3::new(0.0, 0.0, 4.0))),
            MemberSnapshot::new(Vec3::new(30.0, 0.0, 0.0), None),
        ];
        let force = model().alignment(0, &members);
        assert!(force.approx_eq(Vec3::new(1.0, 0.0, 2.0), EPSILON));
    }

    #[test]
    fn test_alignment_zero_without_velocities() {
        let members = [still(0.0, 0.0), still(5.0, 0.0)];
        assert_eq!(model().alignment(0, &members), Vec3::ZERO);
    }

    #[test]
    fn test_small_force_suppressed() {
        let members = [still(0.0, 0.0), still(20.0, 0.0)];
        let slot = Vec3::new(0.05, 0.0, 0.0);
        assert!(model().corrective_force(0, slot, &members).is_none());
    }

    #[test]
    fn test_combined_force() {
        let members = [still(0.0, 0.0), still(2.0, 0.0)];
        let slot = Vec3::new(0.0, 0.0, 5.0);
        let force = model().corrective_force(0, slot, &members).unwrap();
        // cohesion (0,0,5) + separation (-1,0,0)
        assert!(force.approx_eq(Vec3::new(-1.0, 0.0, 5.0), EPSILON));
    }

    #[test]
    fn test_compute_forces_skips_anchor() {
        let members = [still(0.0, 0.0), still(10.0, 0.0), still(-10.0, 0.0)];
        let slots = [Vec3::new(5.0, 0.0, 5.0), Vec3::new(10.0, 0.0, 5.0), Vec3::new(-10.0, 0.0, 0.0)];
        let forces = model().compute_forces(&members, &slots, Some(0), false);

        assert_eq!(forces.len(), 3);
        assert!(forces[0].is_none());
        assert!(forces[1].unwrap().approx_eq(Vec3::new(0.0, 0.0, 5.0), EPSILON));
        assert!(forces[2].is_none());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let members: Vec<MemberSnapshot> = (0..40)
            .map(|i| MemberSnapshot::new(Vec3::new(i as f32 * 1.5, 0.0, 0.0), Some(Vec3::new(1.0, 0.0, 0.0))))
            .collect();
        let slots: Vec<Vec3> = (0..40).map(|i| Vec3::new(i as f32 * 3.0, 0.0, 2.0)).collect();
        let model = SteeringModel::default();

        let sequential = model.compute_forces(&members, &slots, Some(0), false);
        let parallel = model.compute_forces(&members, &slots, Some(0), true);
        assert_eq!(sequential, parallel);
    }
}
