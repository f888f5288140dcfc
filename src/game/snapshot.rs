//! Snapshot encoding for network transmission

use serde_json::value::{to_raw_value, RawValue};

use crate::ws::protocol::ServerMsg;

use super::session::SessionEvent;
use super::state::GameState;

/// Encodes per-tick frames; the state body is serialized once per tick
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the state body shared by every recipient
    pub fn encode_state(&mut self, state: &GameState) -> Result<Box<RawValue>, serde_json::Error> {
        let raw = to_raw_value(state)?;
        self.stats
            .record(state.projectiles.len() + state.asteroids.len(), raw.get().len());
        Ok(raw)
    }

    /// `state` frame for one recipient
    pub fn state_frame(state: &RawValue, last_input_seq: u32) -> Result<String, serde_json::Error> {
        ServerMsg::State {
            state,
            last_input_seq,
        }
        .to_frame()
    }

    /// Event frames broadcast alongside the state
    pub fn event_frames(events: &[SessionEvent]) -> Result<Vec<String>, serde_json::Error> {
        events
            .iter()
            .filter_map(|event| match *event {
                SessionEvent::AsteroidHit {
                    asteroid_id,
                    points,
                } => Some(ServerMsg::Hit {
                    target_id: asteroid_id,
                    points,
                }),
                SessionEvent::ShipDamaged { lives } => Some(ServerMsg::Damage { lives }),
                SessionEvent::ShipDestroyed => Some(ServerMsg::Damage { lives: 0 }),
                SessionEvent::GameOver { final_score, wave } => {
                    Some(ServerMsg::GameOver { final_score, wave })
                }
                _ => None,
            })
            .map(|msg| msg.to_frame())
            .collect()
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Snapshot encoding stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_entities_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, entity_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_entities_per_snapshot =
            self.avg_entities_per_snapshot * ((n - 1.0) / n) + (entity_count as f32 / n);
    }

    pub fn avg_bytes(&self) -> u64 {
        self.total_bytes.checked_div(self.total_snapshots).unwrap_or(0)
    }
}
