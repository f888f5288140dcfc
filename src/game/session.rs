//! Game session state machine: owns the `GameState` and runs one tick at a time

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::asteroid::{
    create_asteroid_wave, step_asteroid_hit_timers, step_asteroids, WaveComposition,
};
use super::combat::{
    apply_ship_collision_damage, find_ship_asteroid_hit, resolve_projectile_asteroid_collisions,
    step_ship_invincibility_state, CollisionEvent, ShipCollisionEvent,
};
use super::projectile::{spawn_projectiles_from_aim, step_projectiles};
use super::ship::{normalize_angle, step_ship_movement, InputState};
use super::state::{GameState, GameStatus};
use super::tuning::{fire_cooldown_ticks, ray_count, GameConfig, MAX_POWER_LEVEL};

/// Effective input of the controlling client for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub keys: InputState,
    pub aim_angle: f64,
    pub fire_pressed: bool,
}

/// Things that happened during a tick, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CountdownFinished,
    ProjectilesFired { count: usize },
    AsteroidHit { asteroid_id: u64, points: u32 },
    AsteroidDestroyed {
        asteroid_id: u64,
        size: u8,
        fragments: usize,
    },
    ShipDamaged { lives: u32 },
    ShipDestroyed,
    WaveCleared { next_wave: u32 },
    GameOver { final_score: u64, wave: u32 },
}

/// Result of [`GameSession::tick`]
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// False when the game was not running and nothing changed
    pub advanced: bool,
    pub events: Vec<SessionEvent>,
}

pub struct GameSession {
    state: GameState,
    config: GameConfig,
    rng: ChaCha8Rng,
    next_projectile_id: u64,
    next_asteroid_id: u64,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            state: GameState::new(config.start_lives),
            config,
            rng,
            next_projectile_id: 0,
            next_asteroid_id: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.state.game_status
    }

    /// Reset for a new match and spawn the first wave
    pub fn start(&mut self) {
        self.state = GameState::new(self.config.start_lives);
        self.next_projectile_id = 0;
        self.next_asteroid_id = 0;
        self.spawn_wave();

        if self.config.countdown_ticks > 0 {
            self.state.game_status = GameStatus::Countdown;
            self.state.countdown_ticks = self.config.countdown_ticks;
        } else {
            self.state.game_status = GameStatus::Playing;
        }
        info!(
            asteroids = self.state.asteroids.len(),
            status = ?self.state.game_status,
            "Game session started"
        );
    }

    /// Drop back to `waiting`, e.g. when the last client leaves
    pub fn halt(&mut self) {
        self.state.game_status = GameStatus::Waiting;
    }

    fn spawn_wave(&mut self) {
        let composition = WaveComposition::for_wave(self.state.wave);
        let (asteroids, next_id) = create_asteroid_wave(
            &composition,
            self.next_asteroid_id,
            &mut self.rng,
            self.config.asteroid_speed_range,
        );
        self.next_asteroid_id = next_id;
        self.state.asteroids.extend(asteroids);
        debug!(wave = self.state.wave, asteroids = composition.total(), "Wave spawned");
    }

    /// Run one tick with the controller's input (`None` when nobody controls)
    pub fn tick(&mut self, input: Option<&TickInput>) -> TickOutcome {
        match self.state.game_status {
            GameStatus::Countdown => self.tick_countdown(),
            GameStatus::Playing => self.tick_playing(input.copied().unwrap_or_default()),
            GameStatus::Waiting | GameStatus::GameOver => TickOutcome::default(),
        }
    }

    fn tick_countdown(&mut self) -> TickOutcome {
        let mut events = Vec::new();
        self.state.countdown_ticks = self.state.countdown_ticks.saturating_sub(1);
        if self.state.countdown_ticks == 0 {
            self.state.game_status = GameStatus::Playing;
            events.push(SessionEvent::CountdownFinished);
        }
        self.state.tick += 1;
        TickOutcome {
            advanced: true,
            events,
        }
    }

    fn tick_playing(&mut self, input: TickInput) -> TickOutcome {
        let mut events = Vec::new();
        let hit_delay = self.config.hit_delay_ticks;

        // Ship movement and aim
        step_ship_movement(
            &self.state.ship,
            &input.keys,
            1,
            self.config.ship_speed_rad_per_tick,
        )
        .apply(&mut self.state.ship);
        self.state.ship.aim_angle = normalize_angle(input.aim_angle);

        // Weapon
        let ship = &mut self.state.ship;
        ship.fire_cooldown = ship.fire_cooldown.saturating_sub(1);
        if input.fire_pressed && ship.fire_cooldown == 0 {
            let (shot, next_id) = spawn_projectiles_from_aim(
                self.next_projectile_id,
                ship.position,
                ship.direction,
                ship.aim_angle,
                ray_count(ship.ray_count_level),
            );
            self.next_projectile_id = next_id;
            ship.fire_cooldown = fire_cooldown_ticks(ship.cooldown_level);
            events.push(SessionEvent::ProjectilesFired { count: shot.len() });
            self.state.projectiles.extend(shot);
        }

        // Motion
        let projectiles = step_projectiles(&self.state.projectiles, 1);
        let asteroids = step_asteroids(&self.state.asteroids, 1);

        // Projectile hits and score
        let resolution =
            resolve_projectile_asteroid_collisions(&projectiles, &asteroids, hit_delay);
        for event in &resolution.events {
            if let CollisionEvent::AsteroidDamaged { asteroid_id, points } = *event {
                self.state.score += u64::from(points);
                events.push(SessionEvent::AsteroidHit {
                    asteroid_id,
                    points,
                });
            }
        }
        self.state.projectiles = resolution.projectiles;

        // Hit-pending lifecycle
        let lifecycle =
            step_asteroid_hit_timers(&resolution.asteroids, self.next_asteroid_id, &mut self.rng);
        self.next_asteroid_id = lifecycle.next_id;
        self.state.asteroids = lifecycle.asteroids;
        events.extend(lifecycle.destroyed.iter().map(|d| SessionEvent::AsteroidDestroyed {
            asteroid_id: d.id,
            size: d.size,
            fragments: d.fragment_ids.len(),
        }));

        // Ship contact and invincibility
        let touched = find_ship_asteroid_hit(&self.state.ship, &self.state.asteroids).is_some();
        let (ship, ship_event) = apply_ship_collision_damage(
            &self.state.ship,
            touched,
            self.config.invincible_duration_ticks,
        );
        self.state.ship = step_ship_invincibility_state(&ship);

        match ship_event {
            ShipCollisionEvent::None => {}
            ShipCollisionEvent::ShipDamaged { lives } => {
                debug!(lives, tick = self.state.tick, "Ship damaged");
                events.push(SessionEvent::ShipDamaged { lives });
            }
            ShipCollisionEvent::ShipDestroyed => {
                self.state.game_status = GameStatus::GameOver;
                events.push(SessionEvent::ShipDestroyed);
                events.push(SessionEvent::GameOver {
                    final_score: self.state.score,
                    wave: self.state.wave,
                });
                info!(
                    score = self.state.score,
                    wave = self.state.wave,
                    tick = self.state.tick,
                    "Ship destroyed, game over"
                );
            }
        }

        if self.state.game_status == GameStatus::Playing && self.state.asteroids.is_empty() {
            self.advance_wave();
            events.push(SessionEvent::WaveCleared {
                next_wave: self.state.wave,
            });
        }

        self.state.tick += 1;
        TickOutcome {
            advanced: true,
            events,
        }
    }

    /// Move to the next wave and grant one power-up level
    fn advance_wave(&mut self) {
        self.state.wave += 1;
        let ship = &mut self.state.ship;
        if self.state.wave % 2 == 0 {
            ship.ray_count_level = (ship.ray_count_level + 1).min(MAX_POWER_LEVEL);
        } else {
            ship.cooldown_level = (ship.cooldown_level + 1).min(MAX_POWER_LEVEL);
        }
        info!(wave = self.state.wave, "Wave cleared");
        self.spawn_wave();
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}
