//! Gameplay tuning constants
//!
//! Angular quantities are radians on the unit sphere; durations are in ticks.

/// Ship great-circle speed
pub const SHIP_SPEED_RAD_PER_TICK: f64 = 0.012;
/// Lives granted at match start
pub const SHIP_START_LIVES: u32 = 3;
/// Ship collision radius against asteroids (added to the asteroid radius)
pub const SHIP_HIT_RADIUS_RAD: f64 = 0.03;
/// Ticks of invincibility after taking a hit
pub const INVINCIBLE_DURATION_TICKS: u32 = 120;

/// Highest power-up level for both progression counters
pub const MAX_POWER_LEVEL: u8 = 4;
/// Fire cooldown per `cooldown_level`
pub const FIRE_COOLDOWN_TICKS: [u32; 5] = [15, 12, 10, 8, 6];

pub const PROJECTILE_SPEED_RAD_PER_TICK: f64 = 0.04;
pub const PROJECTILE_MAX_AGE_TICKS: u32 = 60;
/// Angle between neighbouring rays of a multi-ray shot
pub const PROJECTILE_SPREAD_RAD: f64 = 0.15;
/// Projectile collision radius against asteroids (added to the asteroid radius)
pub const PROJECTILE_HIT_RADIUS_RAD: f64 = 0.01;

pub const ASTEROID_MIN_SPEED_RAD_PER_TICK: f64 = 0.002;
pub const ASTEROID_MAX_START_SPEED_RAD_PER_TICK: f64 = 0.005;
/// Hard cap, fragments included
pub const ASTEROID_MAX_SPEED_RAD_PER_TICK: f64 = 0.009;
/// Fragments move up to this multiple of the parent speed
pub const FRAGMENT_SPEED_FACTOR: f64 = 1.15;
/// Angular radius per unit of asteroid size
pub const ASTEROID_RADIUS_PER_SIZE_RAD: f64 = 0.025;
/// Ticks an asteroid stays hit-pending after taking damage
pub const HIT_DELAY_TICKS: u32 = 6;

/// Ticks per second of the authoritative loop
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Angular radius of an asteroid of the given size
pub fn asteroid_radius(size: u8) -> f64 {
    ASTEROID_RADIUS_PER_SIZE_RAD * f64::from(size)
}

/// Score awarded for damaging an asteroid; smaller rocks are worth more
pub fn points_for_size(size: u8) -> u32 {
    match size {
        1 => 100,
        2 => 50,
        3 => 25,
        _ => 10,
    }
}

/// Fire cooldown for a `cooldown_level`, clamped to the table
pub fn fire_cooldown_ticks(level: u8) -> u32 {
    let idx = usize::from(level.min(MAX_POWER_LEVEL));
    FIRE_COOLDOWN_TICKS[idx]
}

/// Rays per shot for a `ray_count_level`
pub fn ray_count(level: u8) -> u32 {
    1 + u32::from(level.min(MAX_POWER_LEVEL))
}

/// Simulation parameters used by a [`GameSession`](super::GameSession)
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub ship_speed_rad_per_tick: f64,
    pub start_lives: u32,
    pub hit_delay_ticks: u32,
    pub invincible_duration_ticks: u32,
    pub asteroid_speed_range: (f64, f64),
    /// Ticks spent in `countdown` after `ready`; 0 starts play immediately
    pub countdown_ticks: u32,
    /// Fixed RNG seed for reproducible waves
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ship_speed_rad_per_tick: SHIP_SPEED_RAD_PER_TICK,
            start_lives: SHIP_START_LIVES,
            hit_delay_ticks: HIT_DELAY_TICKS,
            invincible_duration_ticks: INVINCIBLE_DURATION_TICKS,
            asteroid_speed_range: (
                ASTEROID_MIN_SPEED_RAD_PER_TICK,
                ASTEROID_MAX_START_SPEED_RAD_PER_TICK,
            ),
            countdown_ticks: 0,
            seed: None,
        }
    }
}
