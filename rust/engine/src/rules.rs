use crate::board::{Board, COLS};
use crate::errors::MoveError;
use crate::game::{Game, Outcome};
use crate::player::Color;

/// Where an accepted disc came to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub row: usize,
    pub column: usize,
}

/// Validates and applies one move for `participant_id`.
///
/// Checks run in a fixed order: game active, mover's turn, column in range,
/// column not full, mover seated. After placing the disc the game is finished
/// as a win when the disc completes a line of four, as a draw when the top row
/// is full, and otherwise the turn passes to the other seat.
///
/// # Errors
///
/// Returns the first failing check as a [`MoveError`]. A rejected move never
/// changes the board, the turn or the status.
///
/// # Examples
///
/// ```
/// use fourinrow_engine::game::Game;
/// use fourinrow_engine::player::{Color, Participant};
/// use fourinrow_engine::rules::apply_move;
/// use fourinrow_engine::errors::MoveError;
///
/// let mut game = Game::new(
///     "g",
///     Participant::human("a", "alice", Color::One),
///     Participant::human("b", "bob", Color::Two),
/// );
///
/// let placement = apply_move(&mut game, "a", 3).expect("legal move");
/// assert_eq!(placement.row, 5);
/// assert_eq!(game.current_turn(), "b");
///
/// assert_eq!(apply_move(&mut game, "a", 3), Err(MoveError::OutOfTurn));
/// assert_eq!(apply_move(&mut game, "b", 7), Err(MoveError::InvalidColumn));
/// ```
pub fn apply_move(
    game: &mut Game,
    participant_id: &str,
    column: i64,
) -> Result<Placement, MoveError> {
    if !game.is_active() {
        return Err(MoveError::NotActive);
    }
    if game.current_turn() != participant_id {
        return Err(MoveError::OutOfTurn);
    }
    let column = usize::try_from(column)
        .ok()
        .filter(|&c| c < COLS)
        .ok_or(MoveError::InvalidColumn)?;
    if game.board().is_column_full(column) {
        return Err(MoveError::ColumnFull);
    }
    let color = game
        .participant(participant_id)
        .map(|p| p.color())
        .ok_or(MoveError::ParticipantNotFound)?;

    let row = game
        .board_mut()
        .place(column, color)
        .ok_or(MoveError::ColumnFull)?;

    if game.board().wins_through(row, column) {
        game.finish(Outcome::Win {
            participant: participant_id.to_string(),
        });
    } else if game.board().is_full() {
        game.finish(Outcome::Draw);
    } else {
        game.pass_turn(participant_id);
    }

    Ok(Placement { row, column })
}

/// Whether `color` has four aligned discs anywhere on `board`.
pub fn check_win(board: &Board, color: Color) -> bool {
    board.has_four(color)
}
