//! # fourinrow-ai: Automated Opponents
//!
//! Decision makers for the automated seat. An opponent is a pure function of
//! the board: it reads the game, returns a column, and never mutates anything.
//!
//! ## Core Components
//!
//! - [`Opponent`] - Trait every automated opponent implements
//! - [`baseline`] - Win-or-block opponent with center-first preference
//! - [`create_opponent`] - Factory selecting an opponent by name
//!
//! ## Quick Start
//!
//! ```rust
//! use fourinrow_ai::{create_opponent, Opponent};
//! use fourinrow_engine::game::Game;
//! use fourinrow_engine::player::{Color, Participant};
//!
//! let game = Game::new(
//!     "g",
//!     Participant::human("h", "human", Color::One),
//!     Participant::automated("bot", "Bot", Color::Two),
//! );
//!
//! let opponent = create_opponent("baseline").expect("known opponent");
//! let column = opponent.best_move(&game, Color::Two).expect("board has room");
//! assert!(column < 7);
//! ```

use fourinrow_engine::game::Game;
use fourinrow_engine::player::Color;
use thiserror::Error;

pub mod baseline;

/// Why an opponent could not produce a column.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpponentError {
    #[error("no legal column left on the board")]
    NoLegalMove,
    #[error("opponent failed: {0}")]
    Internal(String),
}

/// Interface for automated opponents.
///
/// # Required Methods
///
/// - [`best_move`](Opponent::best_move) - Pick a column for `color`
/// - [`name`](Opponent::name) - Identifier of the implementation
pub trait Opponent: Send + Sync {
    /// Choose a column for `color` on the current board of `game`.
    ///
    /// Implementations must be free of side effects. Callers validate the
    /// returned column before applying it.
    fn best_move(&self, game: &Game, color: Color) -> Result<usize, OpponentError>;

    fn name(&self) -> &str;
}

/// Names accepted by [`create_opponent`].
pub const OPPONENTS: &[&str] = &["baseline"];

/// Factory for opponents by name.
///
/// ```rust
/// use fourinrow_ai::create_opponent;
///
/// assert_eq!(create_opponent("baseline").map(|ai| ai.name().to_string()), Some("baseline".into()));
/// assert!(create_opponent("grandmaster").is_none());
/// ```
pub fn create_opponent(name: &str) -> Option<Box<dyn Opponent>> {
    match name {
        "baseline" => Some(Box::new(baseline::BaselineOpponent::new())),
        _ => None,
    }
}
