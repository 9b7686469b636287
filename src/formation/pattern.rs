//! Slot pattern generation
//!
//! Maps (formation type, member count, spacing) to an ordered list of
//! offsets in a leader-local, unrotated frame. Index 0 always belongs to
//! the leader. +z is the formation's front, -x its left.
//!
//! Every pattern is deterministic except `Scattered`, which draws from the
//! random source passed to [`generate_with_rng`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use crate::formation::constants::pattern::*;
use crate::util::vec3::Vec3;

/// Named geometric arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormationType {
    Line,
    Column,
    Wedge,
    Scattered,
    Circle,
    Diamond,
    /// Placeholder for caller-defined layouts; generates as `Line`
    Custom,
}

impl FormationType {
    pub const ALL: [FormationType; 7] = [
        FormationType::Line,
        FormationType::Column,
        FormationType::Wedge,
        FormationType::Scattered,
        FormationType::Circle,
        FormationType::Diamond,
        FormationType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormationType::Line => "line",
            FormationType::Column => "column",
            FormationType::Wedge => "wedge",
            FormationType::Scattered => "scattered",
            FormationType::Circle => "circle",
            FormationType::Diamond => "diamond",
            FormationType::Custom => "custom",
        }
    }
}

impl fmt::Display for FormationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormationType {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to `Custom`, which lays out as a line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = FormationType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(FormationType::Custom);
        Ok(parsed)
    }
}

/// Generate offsets using the thread-local random source for `Scattered`
pub fn generate(formation_type: FormationType, count: usize, spacing: f32) -> Vec<Vec3> {
    generate_with_rng(formation_type, count, spacing, &mut rand::thread_rng())
}

/// Generate `count` leader-local offsets for the given pattern
pub fn generate_with_rng<R: Rng + ?Sized>(
    formation_type: FormationType,
    count: usize,
    spacing: f32,
    rng: &mut R,
) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }

    match formation_type {
        FormationType::Line | FormationType::Custom => line(count, spacing),
        FormationType::Column => column(count, spacing),
        FormationType::Wedge => wedge(count, spacing),
        FormationType::Scattered => scattered(count, spacing, rng),
        FormationType::Circle => circle(count, spacing),
        FormationType::Diamond => diamond(count, spacing),
    }
}

/// Rotate each offset about the vertical axis and translate it to `anchor`
pub fn place(offsets: &[Vec3], anchor: Vec3, rotation: f32) -> Vec<Vec3> {
    offsets
        .iter()
        .map(|offset| anchor + offset.rotate_y(rotation))
        .collect()
}

/// Centered horizontal row
fn line(count: usize, spacing: f32) -> Vec<Vec3> {
    let center = (count as f32 - 1.0) / 2.0;
    (0..count)
        .map(|i| Vec3::new((i as f32 - center) * spacing, 0.0, 0.0))
        .collect()
}

/// Single file behind the leader
fn column(count: usize, spacing: f32) -> Vec<Vec3> {
    (0..count)
        .map(|i| Vec3::new(0.0, 0.0, -(i as f32) * spacing))
        .collect()
}

/// Leader at the point; followers alternate left/right, one row deeper
/// each time both sides of a row are filled
fn wedge(count: usize, spacing: f32) -> Vec<Vec3> {
    let mut offsets = Vec::with_capacity(count);
    offsets.push(Vec3::ZERO);

    for k in 0..count - 1 {
        let row = (k / 2 + 1) as f32;
        let side = if k % 2 == 0 { -1.0 } else { 1.0 };
        offsets.push(Vec3::new(
            side * row * spacing,
            0.0,
            -row * spacing * WEDGE_ROW_DEPTH,
        ));
    }

    offsets
}

fn scattered<R: Rng + ?Sized>(count: usize, spacing: f32, rng: &mut R) -> Vec<Vec3> {
    let mut offsets = Vec::with_capacity(count);
    offsets.push(Vec3::ZERO);

    let min_radius = SCATTER_MIN_RADIUS * spacing;
    let max_radius = SCATTER_MAX_RADIUS * spacing;
    for _ in 1..count {
        let angle = rng.gen_range(0.0..TAU);
        let radius = if max_radius > min_radius {
            rng.gen_range(min_radius..max_radius)
        } else {
            min_radius
        };
        offsets.push(Vec3::from_angle_xz(angle, radius));
    }

    offsets
}

/// Ring whose circumference grows with membership so neighbours stay
/// roughly `spacing` apart
fn circle(count: usize, spacing: f32) -> Vec<Vec3> {
    let radius = spacing * count as f32 / TAU;
    let step = TAU / count as f32;
    (0..count)
        .map(|i| Vec3::from_angle_xz(i as f32 * step, radius))
        .collect()
}

/// Front, left, right, back at `spacing`; extras on an inner ring
fn diamond(count: usize, spacing: f32) -> Vec<Vec3> {
    let cardinals = [
        Vec3::new(0.0, 0.0, spacing),
        Vec3::new(-spacing, 0.0, 0.0),
        Vec3::new(spacing, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -spacing),
    ];

    let mut offsets: Vec<Vec3> = cardinals.iter().copied().take(count).collect();

    if count > DIAMOND_CARDINALS {
        let extras = count - DIAMOND_CARDINALS;
        let radius = DIAMOND_INNER_RING * spacing;
        let step = TAU / extras as f32;
        offsets.extend((0..extras).map(|j| Vec3::from_angle_xz(j as f32 * step, radius)));
    }

    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length_matches_count_for_every_type() {
        let mut rng = StdRng::seed_from_u64(7);
        for formation_type in FormationType::ALL {
            for n in 0..20 {
                let offsets = generate_with_rng(formation_type, n, 3.0, &mut rng);
                assert_eq!(offsets.len(), n, "{formation_type} with {n} members");
            }
        }
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(generate(FormationType::Diamond, 0, 5.0).is_empty());
        assert!(generate(FormationType::Scattered, 0, 5.0).is_empty());
    }

    #[test]
    fn test_line_scenario() {
        let offsets = generate(FormationType::Line, 5, 4.0);
        let xs: Vec<f32> = offsets.iter().map(|o| o.x).collect();
        assert_eq!(xs, vec![-8.0, -4.0, 0.0, 4.0, 8.0]);
        assert!(offsets.iter().all(|o| o.z == 0.0 && o.y == 0.0));
    }

    #[test]
    fn test_line_symmetric_and_increasing() {
        for n in 1..12 {
            let offsets = generate(FormationType::Line, n, 2.5);
            for i in 0..n {
                assert!(approx_eq(offsets[i].x, -offsets[n - 1 - i].x));
            }
            assert!(offsets.windows(2).all(|w| w[1].x > w[0].x));
        }
    }

    #[test]
    fn test_custom_falls_back_to_line() {
        assert_eq!(
            generate(FormationType::Custom, 6, 3.0),
            generate(FormationType::Line, 6, 3.0)
        );
    }

    #[test]
    fn test_column_single_file() {
        let offsets = generate(FormationType::Column, 4, 2.0);
        assert_eq!(offsets[0], Vec3::ZERO);
        assert_eq!(offsets[3], Vec3::new(0.0, 0.0, -6.0));
        assert!(offsets.iter().all(|o| o.x == 0.0));
    }

    #[test]
    fn test_wedge_rows() {
        let offsets = generate(FormationType::Wedge, 6, 5.0);
        assert_eq!(offsets[0], Vec3::ZERO);
        // Row 1: left then right
        assert!(offsets[1].approx_eq(Vec3::new(-5.0, 0.0, -4.0), EPSILON));
        assert!(offsets[2].approx_eq(Vec3::new(5.0, 0.0, -4.0), EPSILON));
        // Row 2
        assert!(offsets[3].approx_eq(Vec3::new(-10.0, 0.0, -8.0), EPSILON));
        assert!(offsets[4].approx_eq(Vec3::new(10.0, 0.0, -8.0), EPSILON));
        // Row 3, left side only
        assert!(offsets[5].approx_eq(Vec3::new(-15.0, 0.0, -12.0), EPSILON));
    }

    #[test]
    fn test_scattered_radius_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let spacing = 4.0;
        let offsets = generate_with_rng(FormationType::Scattered, 50, spacing, &mut rng);

        assert_eq!(offsets[0], Vec3::ZERO);
        for offset in &offsets[1..] {
            let r = offset.length();
            assert!(r >= 0.5 * spacing - EPSILON && r < 1.5 * spacing + EPSILON);
            assert_eq!(offset.y, 0.0);
        }
    }

    #[test]
    fn test_scattered_reproducible_with_seed() {
        let a = generate_with_rng(FormationType::Scattered, 8, 3.0, &mut StdRng::seed_from_u64(9));
        let b = generate_with_rng(FormationType::Scattered, 8, 3.0, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_circle_equidistant() {
        for n in 1..16 {
            let spacing = 3.0;
            let offsets = generate(FormationType::Circle, n, spacing);
            let expected = spacing * n as f32 / TAU;
            for offset in &offsets {
                assert!(approx_eq(offset.length(), expected));
            }
        }
    }

    #[test]
    fn test_diamond_cardinals() {
        let s = 4.0;
        let offsets = generate(FormationType::Diamond, 4, s);
        assert_eq!(
            offsets,
            vec![
                Vec3::new(0.0, 0.0, s),
                Vec3::new(-s, 0.0, 0.0),
                Vec3::new(s, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -s),
            ]
        );

        let partial = generate(FormationType::Diamond, 2, s);
        assert_eq!(partial, offsets[..2].to_vec());
    }

    #[test]
    fn test_diamond_inner_ring() {
        let s = 5.0;
        let offsets = generate(FormationType::Diamond, 6, s);
        for offset in &offsets[..4] {
            assert!(approx_eq(offset.length(), s));
        }
        let r = 0.6 * s;
        assert!(offsets[4].approx_eq(Vec3::new(r, 0.0, 0.0), EPSILON));
        assert!(offsets[5].approx_eq(Vec3::new(-r, 0.0, 0.0), EPSILON));
        assert!(approx_eq(offsets[5].z.atan2(offsets[5].x).abs(), PI));
    }

    #[test]
    fn test_place_zero_rotation_is_translation() {
        let offsets = generate(FormationType::Wedge, 5, 3.0);
        let anchor = Vec3::new(10.0, 1.0, -4.0);
        let placed = place(&offsets, anchor, 0.0);
        for (p, o) in placed.iter().zip(&offsets) {
            assert!(p.approx_eq(anchor + *o, EPSILON));
        }
    }

    #[test]
    fn test_place_rotation_round_trip() {
        let offsets = generate(FormationType::Diamond, 7, 3.0);
        let rotated = place(&offsets, Vec3::ZERO, 0.9);
        let restored = place(&rotated, Vec3::ZERO, -0.9);
        for (r, o) in restored.iter().zip(&offsets) {
            assert!(r.approx_eq(*o, EPSILON));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Wedge".parse::<FormationType>().unwrap(), FormationType::Wedge);
        assert_eq!(" circle ".parse::<FormationType>().unwrap(), FormationType::Circle);
        assert_eq!("phalanx".parse::<FormationType>().unwrap(), FormationType::Custom);
    }
}
