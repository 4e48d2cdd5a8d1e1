//! Baseline opponent.
//!
//! Deterministic, one-ply strategy:
//! 1. Take a column that wins immediately.
//! 2. Otherwise block a column where the other seat would win immediately.
//! 3. Otherwise play the legal column closest to the center.

use crate::{Opponent, OpponentError};
use fourinrow_engine::board::Board;
use fourinrow_engine::game::Game;
use fourinrow_engine::player::Color;

/// Center-first column preference.
pub const MOVE_ORDER: [usize; 7] = [3, 2, 4, 1, 5, 0, 6];

/// First legal column of `board` in [`MOVE_ORDER`].
pub fn first_legal_column(board: &Board) -> Option<usize> {
    MOVE_ORDER
        .into_iter()
        .find(|&col| !board.is_column_full(col))
}

#[derive(Debug, Clone, Default)]
pub struct BaselineOpponent;

impl BaselineOpponent {
    pub fn new() -> Self {
        Self
    }

    fn winning_column(board: &Board, color: Color) -> Option<usize> {
        MOVE_ORDER.into_iter().find(|&col| {
            board
                .with_disc(col, color)
                .is_some_and(|(next, row)| next.wins_through(row, col))
        })
    }
}

impl Opponent for BaselineOpponent {
    fn best_move(&self, game: &Game, color: Color) -> Result<usize, OpponentError> {
        let board = game.board();
        Self::winning_column(board, color)
            .or_else(|| Self::winning_column(board, color.other()))
            .or_else(|| first_legal_column(board))
            .ok_or(OpponentError::NoLegalMove)
    }

    fn name(&self) -> &str {
        "baseline"
    }
}
