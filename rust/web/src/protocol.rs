//! Wire messages exchanged over a player connection.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": ...}`.

use fourinrow_engine::game::{Game, GameId};
use fourinrow_engine::player::{Color, ParticipantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Waiting(String),
    Start(StartPayload),
    /// Full game snapshot
    Update(Game),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub game_id: GameId,
    pub color: Color,
    pub player_id: ParticipantId,
    pub opponent: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    column: serde_json::Number,
}

impl MovePayload {
    /// Fractional or oversized numbers map to a column no board has.
    fn column(&self) -> i64 {
        self.column.as_i64().unwrap_or(i64::MAX)
    }
}

/// Client → server messages the server understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Move { column: i64 },
    /// Any other envelope type; carried only for logging
    Unrecognized(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("malformed move payload: {0}")]
    MovePayload(serde_json::Error),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Envelope)?;
        match envelope.kind.as_str() {
            "move" => {
                let payload: MovePayload = serde_json::from_value(envelope.payload)
                    .map_err(ProtocolError::MovePayload)?;
                Ok(ClientMessage::Move {
                    column: payload.column(),
                })
            }
            _ => Ok(ClientMessage::Unrecognized(envelope.kind)),
        }
    }
}
