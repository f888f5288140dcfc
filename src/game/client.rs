//! Per-connection input session with the sequence watermark

use serde::Serialize;

use crate::ws::protocol::ClientMsg;

use super::session::TickInput;
use super::ship::{normalize_angle, InputState};

/// Client lifecycle as seen by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Connected,
    Ready,
    Playing,
    Ended,
}

/// What happened to an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputApply {
    Applied,
    /// `seq` at or below the watermark; dropped
    Stale,
    /// Not a sequenced message; handled elsewhere
    Unsequenced,
}

/// Pending input written by the socket side and read by the tick
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub status: ClientStatus,
    /// Highest applied sequence number
    pub last_seq: u32,
    pub keys: InputState,
    pub aim_angle: f64,
    pub fire_pressed: bool,
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            status: ClientStatus::Connected,
            last_seq: 0,
            keys: InputState::default(),
            aim_angle: 0.0,
            fire_pressed: false,
        }
    }

    /// Apply a sequenced message if it is newer than the watermark
    pub fn apply_input(&mut self, msg: &ClientMsg) -> InputApply {
        let Some(seq) = msg.seq() else {
            return InputApply::Unsequenced;
        };
        if seq <= self.last_seq {
            return InputApply::Stale;
        }
        self.last_seq = seq;

        match *msg {
            ClientMsg::Input { keys, .. } => self.keys = keys,
            ClientMsg::Aim { angle, .. } => self.aim_angle = normalize_angle(angle),
            ClientMsg::ShootStart { .. } => self.fire_pressed = true,
            ClientMsg::ShootStop { .. } => self.fire_pressed = false,
            ClientMsg::Ready => {}
        }
        InputApply::Applied
    }

    /// Clear pending input and the watermark for a fresh match
    pub fn reset_input(&mut self) {
        self.last_seq = 0;
        self.keys = InputState::default();
        self.aim_angle = 0.0;
        self.fire_pressed = false;
    }

    /// Drop held keys and fire when control is handed over mid-match; the
    /// watermark stays and aim picks up from the ship's current aim
    pub fn take_over_controls(&mut self, aim_angle: f64) {
        self.keys = InputState::default();
        self.fire_pressed = false;
        self.aim_angle = normalize_angle(aim_angle);
    }

    pub fn tick_input(&self) -> TickInput {
        TickInput {
            keys: self.keys,
            aim_angle: self.aim_angle,
            fire_pressed: self.fire_pressed,
        }
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}
