use crate::board::Board;
use crate::player::{Color, Participant, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type GameId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Finished,
}

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Win {
        participant: ParticipantId,
    },
    Draw,
    Forfeit {
        /// The opponent credited with the game
        participant: ParticipantId,
        forfeited: ParticipantId,
    },
}

impl Outcome {
    /// Participant credited with the game, if any.
    pub fn winner(&self) -> Option<&str> {
        match self {
            Outcome::Win { participant } | Outcome::Forfeit { participant, .. } => {
                Some(participant)
            }
            Outcome::Draw => None,
        }
    }
}

/// A two-seat game. Seat one is stored first and moves first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    id: GameId,
    board: Board,
    participants: [Participant; 2],
    current_turn: ParticipantId,
    status: GameStatus,
    #[serde(rename = "winner")]
    outcome: Option<Outcome>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Seats `first` in color one and `second` in color two; `first` moves
    /// first.
    pub fn new(id: impl Into<GameId>, mut first: Participant, mut second: Participant) -> Self {
        let id = id.into();
        first.seat(&id, Color::One);
        second.seat(&id, Color::Two);
        let current_turn = first.id().to_string();
        Self {
            id,
            board: Board::new(),
            participants: [first, second],
            current_turn,
            status: GameStatus::Active,
            outcome: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn board(&self) -> &Board {
        &self.board
    }
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }
    pub fn participants(&self) -> &[Participant; 2] {
        &self.participants
    }
    pub fn current_turn(&self) -> &str {
        &self.current_turn
    }
    pub fn status(&self) -> GameStatus {
        self.status
    }
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id() == id)
    }

    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name() == name)
    }

    /// The seat that is not `id`.
    pub fn opponent_of(&self, id: &str) -> Option<&Participant> {
        self.participant(id)?;
        self.participants.iter().find(|p| p.id() != id)
    }

    pub(crate) fn pass_turn(&mut self, from: &str) {
        if let Some(next) = self.opponent_of(from).map(|p| p.id().to_string()) {
            self.current_turn = next;
        }
    }

    /// Ends the game with `outcome`. Returns `false`, leaving the game
    /// untouched, when it has already finished.
    pub fn finish(&mut self, outcome: Outcome) -> bool {
        if self.status == GameStatus::Finished {
            return false;
        }
        self.status = GameStatus::Finished;
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
        true
    }
}
