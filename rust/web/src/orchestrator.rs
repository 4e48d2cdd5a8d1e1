//! Applies inbound moves and drives the automated seat's reply.

use crate::broadcast::broadcast;
use crate::game::{GameHandle, GameSlot};
use crate::persistence::MatchRecorder;
use crate::protocol::ServerMessage;
use crate::session::SessionError;
use fourinrow_ai::baseline::first_legal_column;
use fourinrow_ai::Opponent;
use fourinrow_engine::errors::MoveError;
use fourinrow_engine::game::Game;
use fourinrow_engine::player::{Color, ParticipantId};
use fourinrow_engine::rules::apply_move;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    /// The mover was told why; nothing changed
    Rejected(MoveError),
    Applied,
    Finished,
    /// The sender has no seat in the game
    Dropped,
}

enum Next {
    Wait,
    GameOver(Game),
    Automated { id: ParticipantId, color: Color },
}

pub struct MoveOrchestrator {
    opponent: Arc<dyn Opponent>,
    recorder: MatchRecorder,
    think_delay: Duration,
}

impl fmt::Debug for MoveOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveOrchestrator")
            .field("opponent", &self.opponent.name())
            .field("think_delay", &self.think_delay)
            .finish()
    }
}

impl MoveOrchestrator {
    pub fn new(opponent: Arc<dyn Opponent>, recorder: MatchRecorder, think_delay: Duration) -> Self {
        Self {
            opponent,
            recorder,
            think_delay,
        }
    }

    /// Plays `column` for the participant called `name`, then the automated
    /// reply if one is due. Moves for one game are handled one at a time in
    /// arrival order.
    pub async fn handle_move(
        &self,
        handle: &GameHandle,
        name: &str,
        column: i64,
    ) -> Result<TurnResult, SessionError> {
        let _turn = handle.begin_turn().await;

        let next = {
            let mut slot = handle.lock()?;
            let Some(participant_id) = slot.id_for_name(name) else {
                tracing::warn!(game_id = %handle.id(), participant = %name, "move from unseated participant dropped");
                return Ok(TurnResult::Dropped);
            };

            if let Err(err) = apply_move(slot.game_mut(), &participant_id, column) {
                tracing::debug!(
                    game_id = %handle.id(),
                    participant = %name,
                    column,
                    kind = err.kind(),
                    "move rejected"
                );
                slot.send_to(&participant_id, ServerMessage::Error(err.to_string()));
                return Ok(TurnResult::Rejected(err));
            }
            broadcast(&slot);
            next_step(&slot)
        };

        match next {
            Next::Wait => Ok(TurnResult::Applied),
            Next::GameOver(game) => {
                self.recorder.game_over(&game);
                Ok(TurnResult::Finished)
            }
            Next::Automated { id, color } => {
                tokio::time::sleep(self.think_delay).await;
                self.play_automated(handle, &id, color)
            }
        }
    }

    fn play_automated(
        &self,
        handle: &GameHandle,
        participant_id: &str,
        color: Color,
    ) -> Result<TurnResult, SessionError> {
        let finished = {
            let mut slot = handle.lock()?;
            let game = slot.game();
            if !game.is_active() || game.current_turn() != participant_id {
                tracing::debug!(game_id = %handle.id(), "automated turn no longer pending");
                return Ok(TurnResult::Applied);
            }

            let column = self.choose_column(game, color);
            if let Err(err) = apply_move(slot.game_mut(), participant_id, column as i64) {
                tracing::error!(game_id = %handle.id(), column, error = %err, "automated move rejected");
                return Ok(TurnResult::Applied);
            }
            broadcast(&slot);
            (!slot.game().is_active()).then(|| slot.game().clone())
        };

        match finished {
            Some(game) => {
                self.recorder.game_over(&game);
                Ok(TurnResult::Finished)
            }
            None => Ok(TurnResult::Applied),
        }
    }

    fn choose_column(&self, game: &Game, color: Color) -> usize {
        let board = game.board();
        match self.opponent.best_move(game, color) {
            Ok(column) if !board.is_column_full(column) => return column,
            Ok(column) => {
                tracing::warn!(game_id = %game.id(), column, opponent = self.opponent.name(), "opponent chose an illegal column");
            }
            Err(err) => {
                tracing::warn!(game_id = %game.id(), error = %err, opponent = self.opponent.name(), "opponent failed");
            }
        }
        first_legal_column(board).unwrap_or(0)
    }
}

fn next_step(slot: &GameSlot) -> Next {
    let game = slot.game();
    if !game.is_active() {
        return Next::GameOver(game.clone());
    }
    match game.participant(game.current_turn()) {
        Some(participant) if participant.is_automated() => Next::Automated {
            id: participant.id().to_string(),
            color: participant.color(),
        },
        _ => Next::Wait,
    }
}
