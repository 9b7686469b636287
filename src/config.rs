use crate::formation::constants::{registry, steering};
use crate::formation::steering::SteeringParams;

/// Formation engine configuration
#[derive(Debug, Clone)]
pub struct FormationConfig {
    /// Seconds between ticks driven by the external scheduler
    pub tick_interval: f32,
    /// Cohesion, separation and alignment tuning
    pub steering: SteeringParams,
    /// Leader distance to the move target that ends a move order
    pub arrival_tolerance: f32,
    /// Floor applied to spacing overrides
    pub min_spacing: f32,
    /// Seed for scattered layouts; `None` draws from entropy
    pub scatter_seed: Option<u64>,
    /// Formations with at least this many members steer in parallel
    pub parallel_threshold: usize,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            tick_interval: registry::TICK_INTERVAL,
            steering: SteeringParams::default(),
            arrival_tolerance: registry::ARRIVAL_TOLERANCE,
            min_spacing: registry::MIN_SPACING,
            scatter_seed: None,
            parallel_threshold: registry::PARALLEL_THRESHOLD,
        }
    }
}

/// Parse a float from the environment that must satisfy `accept`,
/// keeping `current` otherwise
fn env_f32(key: &str, current: f32, accept: fn(f32) -> bool, rule: &str) -> f32 {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<f32>() {
            Ok(parsed) if parsed.is_finite() && accept(parsed) => parsed,
            Ok(_) => {
                tracing::warn!("{} must be a {} number, using default", key, rule);
                current
            }
            Err(_) => {
                tracing::warn!("Invalid {} '{}', using default", key, raw);
                current
            }
        },
        Err(_) => current,
    }
}

fn env_positive_f32(key: &str, current: f32) -> f32 {
    env_f32(key, current, |v| v > 0.0, "positive")
}

/// Zero is allowed so a steering term can be switched off
fn env_non_negative_f32(key: &str, current: f32) -> f32 {
    env_f32(key, current, |v| v >= 0.0, "non-negative")
}

impl FormationConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        config.tick_interval = env_positive_f32("FORMATION_TICK_INTERVAL", config.tick_interval);
        config.arrival_tolerance =
            env_positive_f32("FORMATION_ARRIVAL_TOLERANCE", config.arrival_tolerance);
        // One position tolerance serves both arrival and slot holding
        config.steering.slot_tolerance = config.arrival_tolerance;
        config.min_spacing = env_positive_f32("FORMATION_MIN_SPACING", config.min_spacing);

        config.steering.cohesion_strength = env_non_negative_f32(
            "FORMATION_COHESION_STRENGTH",
            steering::DEFAULT_COHESION_STRENGTH,
        );
        config.steering.separation_strength = env_non_negative_f32(
            "FORMATION_SEPARATION_STRENGTH",
            steering::DEFAULT_SEPARATION_STRENGTH,
        );
        config.steering.alignment_strength = env_non_negative_f32(
            "FORMATION_ALIGNMENT_STRENGTH",
            steering::DEFAULT_ALIGNMENT_STRENGTH,
        );

        if let Ok(seed) = std::env::var("FORMATION_SCATTER_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.scatter_seed = Some(parsed);
            } else {
                tracing::warn!("Invalid FORMATION_SCATTER_SEED '{}', using entropy", seed);
            }
        }

        if let Ok(threshold) = std::env::var("FORMATION_PARALLEL_THRESHOLD") {
            if let Ok(parsed) = threshold.parse::<usize>() {
                config.parallel_threshold = parsed;
            } else {
                tracing::warn!("Invalid FORMATION_PARALLEL_THRESHOLD '{}', using default", threshold);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tick_interval > 0.0) {
            return Err("tick_interval must be positive".to_string());
        }
        if !(self.arrival_tolerance > 0.0) {
            return Err("arrival_tolerance must be positive".to_string());
        }
        if !(self.min_spacing > 0.0) {
            return Err("min_spacing must be positive".to_string());
        }
        let s = &self.steering;
        if s.cohesion_strength < 0.0 || s.separation_strength < 0.0 || s.alignment_strength < 0.0 {
            return Err("steering strengths cannot be negative".to_string());
        }
        if !(s.min_separation > 0.0) {
            return Err("min_separation must be positive".to_string());
        }
        Ok(())
    }
}
