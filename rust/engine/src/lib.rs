//! # fourinrow-engine: Four-in-a-row Game Core
//!
//! Pure game state and move rules for two-seat four-in-a-row on a 6×7 grid.
//! Nothing in this crate performs I/O, spawns tasks or takes locks; callers
//! own the [`game::Game`] and serialize access to it.
//!
//! ## Core Modules
//!
//! - [`board`] - Grid, disc placement and line detection
//! - [`player`] - Seat colors and participants
//! - [`game`] - Game state, status and outcome
//! - [`rules`] - Move validation and application
//! - [`errors`] - Move rejection reasons
//!
//! ## Quick Start
//!
//! ```rust
//! use fourinrow_engine::game::{Game, Outcome};
//! use fourinrow_engine::player::{Color, Participant};
//! use fourinrow_engine::rules::apply_move;
//!
//! let mut game = Game::new(
//!     "demo",
//!     Participant::human("p1", "alice", Color::One),
//!     Participant::human("p2", "bob", Color::Two),
//! );
//!
//! for _ in 0..3 {
//!     apply_move(&mut game, "p1", 3).unwrap();
//!     apply_move(&mut game, "p2", 4).unwrap();
//! }
//! apply_move(&mut game, "p1", 3).unwrap();
//!
//! assert_eq!(game.outcome(), Some(&Outcome::Win { participant: "p1".into() }));
//! ```

pub mod board;
pub mod errors;
pub mod game;
pub mod player;
pub mod rules;
