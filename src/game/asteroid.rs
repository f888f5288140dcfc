//! Asteroid waves, movement and the hit-pending lifecycle

use glam::DVec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::math::{move_on_sphere, random_point_on_sphere, random_tangent_direction};
use super::tuning::{ASTEROID_MAX_SPEED_RAD_PER_TICK, FRAGMENT_SPEED_FACTOR};

pub const MIN_ASTEROID_SIZE: u8 = 1;
pub const MAX_ASTEROID_SIZE: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsteroidState {
    pub id: u64,
    pub position: DVec3,
    pub direction: DVec3,
    pub move_speed: f64,
    /// 1..=4
    pub size: u8,
    pub health: i32,
    /// Damage gate, closed while hit-pending
    pub can_take_damage: bool,
    pub is_hit: bool,
    pub hit_timer: u32,
}

impl AsteroidState {
    pub fn new(id: u64, position: DVec3, direction: DVec3, move_speed: f64, size: u8) -> Self {
        let size = size.clamp(MIN_ASTEROID_SIZE, MAX_ASTEROID_SIZE);
        Self {
            id,
            position,
            direction,
            move_speed,
            size,
            health: 2 * i32::from(size),
            can_take_damage: true,
            is_hit: false,
            hit_timer: 0,
        }
    }
}

/// Number of asteroids of each size in a wave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveComposition {
    pub size1: u32,
    pub size2: u32,
    pub size3: u32,
    pub size4: u32,
}

impl WaveComposition {
    /// Composition used for the given wave number; grows with the wave
    pub fn for_wave(wave: u32) -> Self {
        let wave = wave.max(1);
        Self {
            size1: 0,
            size2: wave / 3,
            size3: 1 + wave / 2,
            size4: (wave + 1) / 2,
        }
    }

    /// Flat list of sizes, largest first
    pub fn sizes(&self) -> Vec<u8> {
        [(4u8, self.size4), (3, self.size3), (2, self.size2), (1, self.size1)]
            .into_iter()
            .flat_map(|(size, count)| std::iter::repeat(size).take(count as usize))
            .collect()
    }

    pub fn total(&self) -> u32 {
        self.size1 + self.size2 + self.size3 + self.size4
    }
}

/// Expand a composition into asteroids with sequential ids from `next_id`.
///
/// Positions are uniform on the sphere and speeds uniform in `speed_range`.
pub fn create_asteroid_wave<R: Rng + ?Sized>(
    composition: &WaveComposition,
    next_id: u64,
    rng: &mut R,
    speed_range: (f64, f64),
) -> (Vec<AsteroidState>, u64) {
    let (min, max) = speed_range;
    let mut id = next_id;
    let asteroids = composition
        .sizes()
        .into_iter()
        .map(|size| {
            let position = random_point_on_sphere(rng);
            let direction = random_tangent_direction(position, rng);
            let speed = if max > min { rng.gen_range(min..=max) } else { min };
            let asteroid = AsteroidState::new(id, position, direction, speed, size);
            id += 1;
            asteroid
        })
        .collect();
    (asteroids, id)
}

/// Advance every asteroid along its great circle; hit-pending ones included
pub fn step_asteroids(asteroids: &[AsteroidState], delta_ticks: u32) -> Vec<AsteroidState> {
    asteroids
        .iter()
        .map(|a| {
            let (position, direction) =
                move_on_sphere(a.position, a.direction, a.move_speed * f64::from(delta_ticks));
            AsteroidState {
                position,
                direction,
                ..a.clone()
            }
        })
        .collect()
}

/// An asteroid removed by the lifecycle step
#[derive(Debug, Clone, PartialEq)]
pub struct DestroyedAsteroid {
    pub id: u64,
    pub size: u8,
    pub fragment_ids: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct AsteroidLifecycle {
    pub asteroids: Vec<AsteroidState>,
    pub destroyed: Vec<DestroyedAsteroid>,
    pub next_id: u64,
}

/// Split a destroyed parent into 2–3 smaller rocks at its position
pub fn fragment_asteroid<R: Rng + ?Sized>(
    parent: &AsteroidState,
    next_id: u64,
    rng: &mut R,
) -> (Vec<AsteroidState>, u64) {
    if parent.size <= MIN_ASTEROID_SIZE {
        return (Vec::new(), next_id);
    }
    let count: u64 = rng.gen_range(2..=3);
    let fragments = (0..count)
        .map(|i| {
            let speed = (parent.move_speed * rng.gen_range(1.0..=FRAGMENT_SPEED_FACTOR))
                .min(ASTEROID_MAX_SPEED_RAD_PER_TICK);
            let direction = random_tangent_direction(parent.position, rng);
            AsteroidState::new(next_id + i, parent.position, direction, speed, parent.size - 1)
        })
        .collect();
    (fragments, next_id + count)
}

/// Run one tick of the hit-pending countdown.
///
/// Expired timers either reopen the damage gate (`health > 0`) or remove the
/// asteroid and replace it with its fragments.
pub fn step_asteroid_hit_timers<R: Rng + ?Sized>(
    asteroids: &[AsteroidState],
    next_id: u64,
    rng: &mut R,
) -> AsteroidLifecycle {
    let mut next_id = next_id;
    let mut survivors = Vec::with_capacity(asteroids.len());
    let mut spawned = Vec::new();
    let mut destroyed = Vec::new();

    for asteroid in asteroids {
        if !asteroid.is_hit {
            survivors.push(asteroid.clone());
            continue;
        }

        let hit_timer = asteroid.hit_timer.saturating_sub(1);
        if hit_timer > 0 {
            survivors.push(AsteroidState {
                hit_timer,
                ..asteroid.clone()
            });
        } else if asteroid.health > 0 {
            survivors.push(AsteroidState {
                hit_timer: 0,
                is_hit: false,
                can_take_damage: true,
                ..asteroid.clone()
            });
        } else {
            let (fragments, id) = fragment_asteroid(asteroid, next_id, rng);
            next_id = id;
            destroyed.push(DestroyedAsteroid {
                id: asteroid.id,
                size: asteroid.size,
                fragment_ids: fragments.iter().map(|f| f.id).collect(),
            });
            spawned.extend(fragments);
        }
    }

    survivors.extend(spawned);
    AsteroidLifecycle {
        asteroids: survivors,
        destroyed,
        next_id,
    }
}
