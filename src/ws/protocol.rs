//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::physics::{GameState, Score};
use crate::game::Role;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Move the sender's own paddle to an absolute y
    Move { y: f64 },

    /// Any other well-formed message type. Ignored by the server.
    #[serde(other)]
    Unknown,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Role assignment, sent once right after connect
    Side { side: Role },

    /// Authoritative state, sent every tick
    State { state: StateView },

    /// Any other well-formed message type. Ignored by clients.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleView {
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Wire shape of [`GameState`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub left: PaddleView,
    pub right: PaddleView,
    pub ball: BallView,
    pub score: Score,
}

impl From<&GameState> for StateView {
    fn from(state: &GameState) -> Self {
        Self {
            left: PaddleView { y: state.left.y },
            right: PaddleView { y: state.right.y },
            ball: BallView {
                x: state.ball.pos.x,
                y: state.ball.pos.y,
                vx: state.ball.vel.x,
                vy: state.ball.vel.y,
            },
            score: state.score,
        }
    }
}

/// Inbound frame that could not be read as a protocol message
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Binary frames are not part of the protocol")]
    Binary,
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
