//! Per-connection session loop.
//!
//! A session joins matchmaking, then reads one text frame at a time until
//! the stream ends. Only `move` frames are acted on. When the stream ends the
//! participant is withdrawn from matchmaking and its game starts the
//! disconnect grace period.

use crate::connection::Connection;
use crate::errors::IntoErrorResponse;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::AppContext;
use fourinrow_engine::game::GameId;
use futures::{Stream, StreamExt};
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;

pub const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),
    #[error("Participant not seated: {0}")]
    ParticipantNotSeated(String),
    #[error("A username is required")]
    MissingUsername,
    #[error("Username is longer than {max} characters")]
    UsernameTooLong { max: usize },
    #[error("Game storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::GameNotFound(_) => StatusCode::NOT_FOUND,
            SessionError::ParticipantNotSeated(_) => StatusCode::CONFLICT,
            SessionError::MissingUsername | SessionError::UsernameTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            SessionError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::GameNotFound(_) => "game_not_found",
            SessionError::ParticipantNotSeated(_) => "participant_not_seated",
            SessionError::MissingUsername => "missing_username",
            SessionError::UsernameTooLong { .. } => "username_too_long",
            SessionError::StoragePoisoned => "storage_poisoned",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::GameNotFound(id) => Some(serde_json::json!({ "game_id": id })),
            SessionError::UsernameTooLong { max } => {
                Some(serde_json::json!({ "max_len": max }))
            }
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        match self {
            SessionError::StoragePoisoned => crate::errors::ErrorSeverity::Critical,
            _ if self.status_code().is_server_error() => crate::errors::ErrorSeverity::Server,
            _ => crate::errors::ErrorSeverity::Client,
        }
    }
}

/// Trims `raw` and checks it is usable as a display name.
pub fn validate_username(raw: Option<&str>) -> Result<String, SessionError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(SessionError::MissingUsername);
    }
    if name.chars().count() > MAX_USERNAME_LEN {
        return Err(SessionError::UsernameTooLong {
            max: MAX_USERNAME_LEN,
        });
    }
    Ok(name.to_string())
}

pub struct Session {
    name: String,
    connection: Connection,
    context: AppContext,
}

impl Session {
    pub fn new(name: impl Into<String>, connection: Connection, context: AppContext) -> Self {
        Self {
            name: name.into(),
            connection,
            context,
        }
    }

    /// Runs until `inbound` ends or yields an error.
    pub async fn run<S, E>(self, mut inbound: S)
    where
        S: Stream<Item = Result<String, E>> + Unpin,
        E: fmt::Display,
    {
        tracing::info!(participant = %self.name, connection_id = self.connection.id(), "session opened");

        match self
            .context
            .matchmaker()
            .join(&self.name, self.connection.clone())
        {
            Ok(outcome) => {
                tracing::debug!(participant = %self.name, outcome = ?outcome, "joined");
            }
            Err(err) => {
                tracing::error!(participant = %self.name, error = %err, "join failed");
                self.connection.send(ServerMessage::Error(err.to_string()));
                return;
            }
        }

        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(text) => {
                    if let Err(err) = self.dispatch(&text).await {
                        tracing::warn!(participant = %self.name, error = %err, "message handling failed");
                    }
                }
                Err(err) => {
                    tracing::debug!(participant = %self.name, error = %err, "read failed");
                    break;
                }
            }
        }

        self.close();
    }

    async fn dispatch(&self, text: &str) -> Result<(), SessionError> {
        let column = match ClientMessage::parse(text) {
            Ok(ClientMessage::Move { column }) => column,
            Ok(ClientMessage::Unrecognized(kind)) => {
                tracing::debug!(participant = %self.name, kind = %kind, "ignoring message");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(participant = %self.name, error = %err, "ignoring malformed message");
                return Ok(());
            }
        };

        let Some(handle) = self
            .context
            .registry()
            .find_active_by_participant(&self.name)
        else {
            tracing::debug!(participant = %self.name, column, "move without an active game");
            return Ok(());
        };

        let result = self
            .context
            .orchestrator()
            .handle_move(&handle, &self.name, column)
            .await?;
        tracing::debug!(game_id = %handle.id(), participant = %self.name, column, result = ?result, "move handled");
        Ok(())
    }

    fn close(&self) {
        let connection_id = self.connection.id();
        self.context.matchmaker().withdraw(&self.name, connection_id);
        if let Err(err) = self
            .context
            .disconnects()
            .on_disconnect(&self.name, connection_id)
        {
            tracing::error!(participant = %self.name, error = %err, "disconnect handling failed");
        }
        tracing::info!(participant = %self.name, connection_id, "session closed");
    }
}
