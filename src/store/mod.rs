//! Match result hand-off to the persistence collaborator

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Final outcome of a match, produced when the ship is destroyed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Client that controlled the ship when the match ended
    pub controller_id: Option<Uuid>,
    pub final_score: u64,
    pub wave: u32,
    pub ticks: u64,
    pub finished_at: DateTime<Utc>,
}

/// Receives finished match results.
///
/// Called from inside a tick, so implementations must not block; forward to a
/// background task if the write is slow.
pub trait ResultStore: Send + Sync {
    fn record(&self, outcome: &MatchOutcome);
}

/// Default store: writes the outcome to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResultStore;

impl ResultStore for LogResultStore {
    fn record(&self, outcome: &MatchOutcome) {
        info!(
            controller_id = ?outcome.controller_id,
            final_score = outcome.final_score,
            wave = outcome.wave,
            ticks = outcome.ticks,
            finished_at = %outcome.finished_at,
            "Match result recorded"
        );
    }
}
