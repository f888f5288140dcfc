//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::game::ship::InputState;

/// Largest accepted aim angle magnitude, in radians
pub const MAX_AIM_ANGLE_ABS: f64 = 1.0e6;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start (or restart) a match and take ship control
    Ready,

    /// Held movement keys
    Input {
        /// Sequence number for client-side reconciliation
        seq: u32,
        /// Client tick the input was sampled on
        tick: u64,
        keys: InputState,
    },

    /// Aim angle in radians relative to the ship heading
    Aim { seq: u32, angle: f64 },

    ShootStart { seq: u32 },

    ShootStop { seq: u32 },
}

impl ClientMsg {
    /// Sequence number, `None` for unsequenced messages
    pub fn seq(&self) -> Option<u32> {
        match *self {
            ClientMsg::Ready => None,
            ClientMsg::Input { seq, .. }
            | ClientMsg::Aim { seq, .. }
            | ClientMsg::ShootStart { seq }
            | ClientMsg::ShootStop { seq } => Some(seq),
        }
    }
}

/// Why an inbound frame was rejected
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field `{0}` out of range")]
    OutOfRange(&'static str),
}

/// Parse and shape-check a text frame from a client
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    let msg: ClientMsg = serde_json::from_str(text)?;
    if let ClientMsg::Aim { angle, .. } = msg {
        if !angle.is_finite() || angle.abs() > MAX_AIM_ANGLE_ABS {
            return Err(ProtocolError::OutOfRange("angle"));
        }
    }
    Ok(msg)
}

/// Messages sent from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg<'a> {
    /// Full game state, sent every tick
    State {
        /// Pre-encoded `GameState`, shared by every recipient
        state: &'a RawValue,
        /// Highest input sequence applied for the receiving client
        last_input_seq: u32,
    },

    /// An asteroid took damage
    Hit { target_id: u64, points: u32 },

    /// Ship lost a life
    Damage { lives: u32 },

    GameOver { final_score: u64, wave: u32 },
}

impl ServerMsg<'_> {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
