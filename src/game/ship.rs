//! Ship movement and aim on the sphere surface

use std::f64::consts::TAU;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use super::math::{great_circle_rotation, normalize, tangent_projection};

/// Directional keys held by the controlling client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Authoritative ship state.
///
/// `orientation` maps the reference frame (position `+Z`, heading `+Y`) onto the
/// current frame; `position` and `direction` are always derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipState {
    pub position: DVec3,
    pub direction: DVec3,
    pub orientation: DQuat,
    /// Radians in `[0, 2π)`, measured from the heading towards the ship's right
    pub aim_angle: f64,
    pub lives: u32,
    pub invincible: bool,
    pub invincible_ticks: u32,
    pub cooldown_level: u8,
    pub ray_count_level: u8,
    /// Ticks until the weapon may fire again
    pub fire_cooldown: u32,
}

impl ShipState {
    pub fn new(lives: u32) -> Self {
        Self {
            position: DVec3::Z,
            direction: DVec3::Y,
            orientation: DQuat::IDENTITY,
            aim_angle: 0.0,
            lives,
            invincible: false,
            invincible_ticks: 0,
            cooldown_level: 0,
            ray_count_level: 0,
            fire_cooldown: 0,
        }
    }

    /// Unit vector pointing to the ship's right in the tangent plane
    pub fn right(&self) -> DVec3 {
        normalize(self.direction.cross(self.position))
    }
}

/// Result of one movement step
#[derive(Debug, Clone, PartialEq)]
pub struct ShipMove {
    pub position: DVec3,
    pub direction: DVec3,
    pub orientation: DQuat,
    pub moved: bool,
}

impl ShipMove {
    fn unchanged(ship: &ShipState) -> Self {
        Self {
            position: ship.position,
            direction: ship.direction,
            orientation: ship.orientation,
            moved: false,
        }
    }

    pub fn apply(self, ship: &mut ShipState) {
        ship.position = self.position;
        ship.direction = self.direction;
        ship.orientation = self.orientation;
    }
}

fn key_axis(positive: bool, negative: bool) -> f64 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Move the ship from held keys.
///
/// Forward/backward and right/left form a planar move vector in the ship's
/// forward/right tangent basis. The vector is normalized, so diagonals are not
/// faster, then applied as a great-circle rotation of the whole orientation.
pub fn step_ship_movement(
    ship: &ShipState,
    keys: &InputState,
    delta_ticks: u32,
    speed_rad_per_tick: f64,
) -> ShipMove {
    let forward = key_axis(keys.forward, keys.backward);
    let strafe = key_axis(keys.right, keys.left);
    if forward == 0.0 && strafe == 0.0 {
        return ShipMove::unchanged(ship);
    }

    let heading = ship.direction * forward + ship.right() * strafe;
    let angle = speed_rad_per_tick * f64::from(delta_ticks);
    let Some(rotation) = great_circle_rotation(ship.position, normalize(heading), angle) else {
        return ShipMove::unchanged(ship);
    };

    let orientation = (rotation * ship.orientation).normalize();
    let position = normalize(orientation.mul_vec3(DVec3::Z));
    let direction = normalize(tangent_projection(orientation.mul_vec3(DVec3::Y), position));

    ShipMove {
        position,
        direction,
        orientation,
        moved: true,
    }
}

/// Wrap an angle into `[0, 2π)`
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Unit tangent for an aim angle relative to the ship heading
pub fn aim_direction(position: DVec3, direction: DVec3, aim_angle: f64) -> DVec3 {
    let right = direction.cross(position);
    let (sin, cos) = aim_angle.sin_cos();
    normalize(tangent_projection(direction * cos + right * sin, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::math::angular_distance;

    const TOL: f64 = 1e-4;

    fn keys(forward: bool, backward: bool, left: bool, right: bool) -> InputState {
        InputState {
            forward,
            backward,
            left,
            right,
        }
    }

    #[test]
    fn forward_for_sixty_ticks_covers_expected_arc() {
        let mut ship = ShipState::new(3);
        let start = ship.position;
        let input = keys(true, false, false, false);
        for _ in 0..60 {
            let step = step_ship_movement(&ship, &input, 1, 0.02);
            assert!(step.moved);
            step.apply(&mut ship);
            assert!((ship.position.length() - 1.0).abs() < TOL);
            assert!((ship.direction.length() - 1.0).abs() < TOL);
            assert!(ship.direction.dot(ship.position).abs() < TOL);
        }
        assert!((angular_distance(start, ship.position) - 1.2).abs() < 1e-3);
    }

    #[test]
    fn opposing_keys_cancel() {
        let ship = ShipState::new(3);
        let step = step_ship_movement(&ship, &keys(true, true, true, true), 1, 0.02);
        assert!(!step.moved);
        assert_eq!(step.position, ship.position);
    }

    #[test]
    fn strafe_moves_to_the_right() {
        let ship = ShipState::new(3);
        let step = step_ship_movement(&ship, &keys(false, false, false, true), 1, 0.1);
        assert!(step.moved);
        assert!(step.position.x > 0.0);
        assert!(step.position.y.abs() < 1e-9);
        // heading is transported, not turned
        assert!((step.direction - DVec3::Y).length() < 1e-9);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let ship = ShipState::new(3);
        let diag = step_ship_movement(&ship, &keys(true, false, false, true), 1, 0.05);
        let straight = step_ship_movement(&ship, &keys(true, false, false, false), 1, 0.05);
        let d1 = angular_distance(ship.position, diag.position);
        let d2 = angular_distance(ship.position, straight.position);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn zero_delta_does_not_move() {
        let ship = ShipState::new(3);
        let step = step_ship_movement(&ship, &keys(true, false, false, false), 0, 0.05);
        assert!(!step.moved);
    }

    #[test]
    fn angles_wrap_into_canonical_range() {
        let wrapped = normalize_angle(-std::f64::consts::FRAC_PI_2);
        assert!((wrapped - 1.5 * std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert!(normalize_angle(-1e-20) < TAU);
        assert!((normalize_angle(7.0) - (7.0 - TAU)).abs() < 1e-12);
    }

    #[test]
    fn aim_zero_is_heading_and_quarter_turn_is_right() {
        let ship = ShipState::new(3);
        let ahead = aim_direction(ship.position, ship.direction, 0.0);
        assert!((ahead - DVec3::Y).length() < 1e-12);
        let right = aim_direction(ship.position, ship.direction, std::f64::consts::FRAC_PI_2);
        assert!((right - ship.right()).length() < 1e-9);
    }
}
