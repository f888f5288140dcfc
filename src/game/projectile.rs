//! Projectile spawn, advance and expiry

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::math::move_on_sphere;
use super::ship::aim_direction;
use super::tuning::{PROJECTILE_MAX_AGE_TICKS, PROJECTILE_SPEED_RAD_PER_TICK, PROJECTILE_SPREAD_RAD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    pub id: u64,
    pub position: DVec3,
    /// Tangent to the sphere at `position`
    pub direction: DVec3,
    pub age_ticks: u32,
}

/// Spawn a shot of `ray_count` projectiles centered on the aim angle.
///
/// Ids are assigned from `next_id`; the advanced counter is returned alongside
/// the new projectiles.
pub fn spawn_projectiles_from_aim(
    next_id: u64,
    ship_position: DVec3,
    ship_direction: DVec3,
    aim_angle: f64,
    ray_count: u32,
) -> (Vec<ProjectileState>, u64) {
    let ray_count = ray_count.max(1);
    let center = f64::from(ray_count - 1) * 0.5;

    let projectiles: Vec<ProjectileState> = (0..ray_count)
        .map(|i| {
            let offset = (f64::from(i) - center) * PROJECTILE_SPREAD_RAD;
            ProjectileState {
                id: next_id + u64::from(i),
                position: ship_position,
                direction: aim_direction(ship_position, ship_direction, aim_angle + offset),
                age_ticks: 0,
            }
        })
        .collect();

    (projectiles, next_id + u64::from(ray_count))
}

/// Advance every projectile and drop the ones that reached max age
pub fn step_projectiles(projectiles: &[ProjectileState], delta_ticks: u32) -> Vec<ProjectileState> {
    let angle = PROJECTILE_SPEED_RAD_PER_TICK * f64::from(delta_ticks);
    projectiles
        .iter()
        .filter_map(|p| {
            let age_ticks = p.age_ticks + delta_ticks;
            if age_ticks >= PROJECTILE_MAX_AGE_TICKS {
                return None;
            }
            let (position, direction) = move_on_sphere(p.position, p.direction, angle);
            Some(ProjectileState {
                id: p.id,
                position,
                direction,
                age_ticks,
            })
        })
        .collect()
}
