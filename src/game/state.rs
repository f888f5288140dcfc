//! Canonical game state broadcast to clients

use serde::{Deserialize, Serialize};

use super::asteroid::AsteroidState;
use super::projectile::ProjectileState;
use super::ship::ShipState;

/// Shared game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    /// No controlling client yet
    Waiting,
    /// Optional pause between `ready` and play
    Countdown,
    Playing,
    /// Ship destroyed; waits for the next `ready`
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub tick: u64,
    pub ship: ShipState,
    pub projectiles: Vec<ProjectileState>,
    pub asteroids: Vec<AsteroidState>,
    pub score: u64,
    pub wave: u32,
    pub game_status: GameStatus,
    /// Ticks left while in `countdown`
    pub countdown_ticks: u32,
}

impl GameState {
    pub fn new(start_lives: u32) -> Self {
        Self {
            tick: 0,
            ship: ShipState::new(start_lives),
            projectiles: Vec::new(),
            asteroids: Vec::new(),
            score: 0,
            wave: 1,
            game_status: GameStatus::Waiting,
            countdown_ticks: 0,
        }
    }
}
