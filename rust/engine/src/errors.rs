use thiserror::Error;

/// Reasons a move is refused. None of these change the game they were
/// raised against.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("game is not active")]
    NotActive,
    #[error("not your turn")]
    OutOfTurn,
    #[error("invalid column")]
    InvalidColumn,
    #[error("column is full")]
    ColumnFull,
    #[error("player not found")]
    ParticipantNotFound,
}

impl MoveError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MoveError::NotActive => "not_active",
            MoveError::OutOfTurn => "out_of_turn",
            MoveError::InvalidColumn => "invalid_column",
            MoveError::ColumnFull => "column_full",
            MoveError::ParticipantNotFound => "participant_not_found",
        }
    }
}
