/// Distance at which a member counts as standing on a point: its slot for
/// cohesion, the move target for arrival
pub const POSITION_TOLERANCE: f32 = 1.0;

/// Pattern geometry constants
pub mod pattern {
    /// Wedge row depth as a fraction of spacing
    pub const WEDGE_ROW_DEPTH: f32 = 0.8;
    /// Scattered placement radius range, as fractions of spacing
    pub const SCATTER_MIN_RADIUS: f32 = 0.5;
    pub const SCATTER_MAX_RADIUS: f32 = 1.5;
    /// Radius of the inner diamond ring, as a fraction of spacing
    pub const DIAMOND_INNER_RING: f32 = 0.6;
    /// Number of cardinal diamond points before the inner ring starts
    pub const DIAMOND_CARDINALS: usize = 4;
}

/// Steering model constants
pub mod steering {
    /// Members within this distance of their slot get no cohesion pull
    pub const SLOT_TOLERANCE: f32 = super::POSITION_TOLERANCE;
    /// Cohesion vector magnitude cap (world units)
    pub const MAX_COHESION_DISTANCE: f32 = 10.0;
    /// Formation-mates closer than this push each other apart
    pub const MIN_SEPARATION: f32 = 3.0;
    /// Combined forces below this magnitude issue no move command
    pub const MIN_FORCE: f32 = 0.1;

    pub const DEFAULT_COHESION_STRENGTH: f32 = 1.0;
    pub const DEFAULT_SEPARATION_STRENGTH: f32 = 1.5;
    pub const DEFAULT_ALIGNMENT_STRENGTH: f32 = 0.3;
}

/// Registry and scheduling constants
pub mod registry {
    /// Fixed tick interval in seconds
    pub const TICK_INTERVAL: f32 = 0.1;
    /// Leader distance to the move target that counts as arrival
    pub const ARRIVAL_TOLERANCE: f32 = super::POSITION_TOLERANCE;
    /// Floor applied by `set_spacing`
    pub const MIN_SPACING: f32 = 2.0;
    /// Formations must keep at least this many valid members to survive a tick
    pub const MIN_MEMBERS: usize = 2;
    /// Member count at which steering is computed with rayon
    pub const PARALLEL_THRESHOLD: usize = 32;
}
