//! Collision resolution - projectile hits, ship damage, invincibility

use super::asteroid::AsteroidState;
use super::math::angular_distance;
use super::projectile::ProjectileState;
use super::ship::ShipState;
use super::tuning::{
    asteroid_radius, points_for_size, PROJECTILE_HIT_RADIUS_RAD, SHIP_HIT_RADIUS_RAD,
};

/// A projectile overlapping an asteroid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    pub projectile_id: u64,
    pub asteroid_id: u64,
}

/// Events produced by projectile/asteroid resolution, in resolution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionEvent {
    ProjectileConsumed {
        projectile_id: u64,
        asteroid_id: u64,
    },
    AsteroidDamaged { asteroid_id: u64, points: u32 },
}

#[derive(Debug, Clone)]
pub struct CollisionResolution {
    pub projectiles: Vec<ProjectileState>,
    pub asteroids: Vec<AsteroidState>,
    pub events: Vec<CollisionEvent>,
}

/// Outcome of a ship/asteroid contact check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipCollisionEvent {
    None,
    ShipDamaged { lives: u32 },
    ShipDestroyed,
}

fn projectile_touches(projectile: &ProjectileState, asteroid: &AsteroidState) -> bool {
    angular_distance(projectile.position, asteroid.position)
        < PROJECTILE_HIT_RADIUS_RAD + asteroid_radius(asteroid.size)
}

/// Pair each projectile with at most one asteroid.
///
/// The first asteroid in iteration order wins when several overlap.
pub fn find_projectile_asteroid_hits(
    projectiles: &[ProjectileState],
    asteroids: &[AsteroidState],
) -> Vec<ProjectileHit> {
    projectiles
        .iter()
        .filter_map(|p| {
            asteroids
                .iter()
                .find(|a| projectile_touches(p, a))
                .map(|a| ProjectileHit {
                    projectile_id: p.id,
                    asteroid_id: a.id,
                })
        })
        .collect()
}

/// Consume hitting projectiles and damage asteroids whose gate is open.
///
/// A closed gate still consumes the projectile, so one hit-delay window costs an
/// asteroid at most one point of health.
pub fn resolve_projectile_asteroid_collisions(
    projectiles: &[ProjectileState],
    asteroids: &[AsteroidState],
    hit_delay_ticks: u32,
) -> CollisionResolution {
    let hits = find_projectile_asteroid_hits(projectiles, asteroids);
    let mut next_asteroids = asteroids.to_vec();
    let mut events = Vec::with_capacity(hits.len() * 2);

    for hit in &hits {
        events.push(CollisionEvent::ProjectileConsumed {
            projectile_id: hit.projectile_id,
            asteroid_id: hit.asteroid_id,
        });

        let Some(asteroid) = next_asteroids.iter_mut().find(|a| a.id == hit.asteroid_id) else {
            continue;
        };
        if !asteroid.can_take_damage {
            continue;
        }
        asteroid.health -= 1;
        asteroid.can_take_damage = false;
        asteroid.is_hit = true;
        asteroid.hit_timer = hit_delay_ticks;
        events.push(CollisionEvent::AsteroidDamaged {
            asteroid_id: asteroid.id,
            points: points_for_size(asteroid.size),
        });
    }

    let next_projectiles = projectiles
        .iter()
        .filter(|p| !hits.iter().any(|h| h.projectile_id == p.id))
        .cloned()
        .collect();

    CollisionResolution {
        projectiles: next_projectiles,
        asteroids: next_asteroids,
        events,
    }
}

/// First asteroid overlapping the ship, if any
pub fn find_ship_asteroid_hit<'a>(
    ship: &ShipState,
    asteroids: &'a [AsteroidState],
) -> Option<&'a AsteroidState> {
    asteroids.iter().find(|a| {
        angular_distance(ship.position, a.position) < SHIP_HIT_RADIUS_RAD + asteroid_radius(a.size)
    })
}

/// Take one life if the ship is vulnerable and still alive
pub fn apply_ship_collision_damage(
    ship: &ShipState,
    hit: bool,
    invincible_duration_ticks: u32,
) -> (ShipState, ShipCollisionEvent) {
    if !hit || ship.invincible || ship.lives == 0 {
        return (ship.clone(), ShipCollisionEvent::None);
    }

    let lives = ship.lives - 1;
    let next = ShipState {
        lives,
        invincible: true,
        invincible_ticks: invincible_duration_ticks,
        ..ship.clone()
    };
    let event = if lives == 0 {
        ShipCollisionEvent::ShipDestroyed
    } else {
        ShipCollisionEvent::ShipDamaged { lives }
    };
    (next, event)
}

/// Count invincibility down by one tick
pub fn step_ship_invincibility_state(ship: &ShipState) -> ShipState {
    if !ship.invincible {
        return ship.clone();
    }
    let invincible_ticks = ship.invincible_ticks.saturating_sub(1);
    ShipState {
        invincible: invincible_ticks > 0,
        invincible_ticks,
        ..ship.clone()
    }
}
