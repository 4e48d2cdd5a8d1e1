//! A live game as hosted by the server.
//!
//! [`GameHandle`] pairs the engine [`Game`] with the connections and forfeit
//! timers of its seats. Two locks guard it:
//!
//! - `slot` (std mutex) protects state and is never held across an await.
//! - `turn` (tokio mutex) serializes whole move-handling sequences,
//!   including the automated opponent's thinking pause, so moves for one
//!   game are processed in arrival order.

use crate::connection::{Connection, ConnectionId};
use crate::protocol::{ServerMessage, StartPayload};
use crate::session::SessionError;
use crate::timer::Timer;
use chrono::{DateTime, Utc};
use fourinrow_engine::game::{Game, GameId};
use fourinrow_engine::player::ParticipantId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// How the server reaches one seat.
#[derive(Debug, Default)]
pub struct SeatLink {
    connection: Option<Connection>,
    forfeit: Option<Timer>,
}

impl SeatLink {
    pub fn bound(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
            forfeit: None,
        }
    }
}

#[derive(Debug)]
pub struct GameSlot {
    game: Game,
    links: HashMap<ParticipantId, SeatLink>,
}

impl GameSlot {
    pub fn new(game: Game, links: HashMap<ParticipantId, SeatLink>) -> Self {
        Self { game, links }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Participant id seated under `name`.
    pub fn id_for_name(&self, name: &str) -> Option<ParticipantId> {
        self.game
            .participant_by_name(name)
            .map(|participant| participant.id().to_string())
    }

    pub fn connection_id(&self, participant_id: &str) -> Option<ConnectionId> {
        self.links
            .get(participant_id)?
            .connection
            .as_ref()
            .map(Connection::id)
    }

    /// Sends to one seat. Returns `false` when the seat has no open
    /// connection.
    pub fn send_to(&self, participant_id: &str, message: ServerMessage) -> bool {
        self.links
            .get(participant_id)
            .and_then(|link| link.connection.as_ref())
            .is_some_and(|connection| connection.send(message))
    }

    /// Attaches `connection` to a seat and marks it connected.
    pub fn bind(&mut self, participant_id: &str, connection: Connection) {
        self.links.entry(participant_id.to_string()).or_default().connection = Some(connection);
        if let Some(participant) = self.game.participant_mut(participant_id) {
            participant.set_connected(true);
        }
    }

    pub fn mark_disconnected(&mut self, participant_id: &str) {
        if let Some(participant) = self.game.participant_mut(participant_id) {
            participant.set_connected(false);
        }
    }

    /// Installs a forfeit timer, handing back the one it replaces.
    pub fn replace_forfeit_timer(&mut self, participant_id: &str, timer: Timer) -> Option<Timer> {
        self.links
            .entry(participant_id.to_string())
            .or_default()
            .forfeit
            .replace(timer)
    }

    pub fn take_forfeit_timer(&mut self, participant_id: &str) -> Option<Timer> {
        self.links.get_mut(participant_id)?.forfeit.take()
    }

    pub fn forfeit_generation(&self, participant_id: &str) -> Option<u64> {
        self.links
            .get(participant_id)?
            .forfeit
            .as_ref()
            .map(Timer::generation)
    }

    pub fn start_payload(&self, participant_id: &str) -> Option<StartPayload> {
        let participant = self.game.participant(participant_id)?;
        let opponent = self.game.opponent_of(participant_id)?;
        Some(StartPayload {
            game_id: self.game.id().to_string(),
            color: participant.color(),
            player_id: participant.id().to_string(),
            opponent: opponent.name().to_string(),
        })
    }

    /// Sends `start` to every human seat.
    pub fn announce_start(&self) {
        for participant in self.game.participants() {
            if participant.is_automated() {
                continue;
            }
            if let Some(payload) = self.start_payload(participant.id()) {
                self.send_to(participant.id(), ServerMessage::Start(payload));
            }
        }
    }

    fn cancel_timers(&mut self) {
        for link in self.links.values_mut() {
            if let Some(timer) = link.forfeit.take() {
                timer.cancel();
            }
        }
    }
}

#[derive(Debug)]
pub struct GameHandle {
    id: GameId,
    human_names: Vec<String>,
    turn: tokio::sync::Mutex<()>,
    slot: Mutex<GameSlot>,
}

impl GameHandle {
    pub fn new(slot: GameSlot) -> Self {
        let id = slot.game.id().to_string();
        let human_names = slot
            .game
            .participants()
            .iter()
            .filter(|participant| !participant.is_automated())
            .map(|participant| participant.name().to_string())
            .collect();
        Self {
            id,
            human_names,
            turn: tokio::sync::Mutex::new(()),
            slot: Mutex::new(slot),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn human_names(&self) -> &[String] {
        &self.human_names
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, GameSlot>, SessionError> {
        self.slot.lock().map_err(|_| SessionError::StoragePoisoned)
    }

    /// Waits for exclusive use of the game's move sequence.
    pub async fn begin_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    pub fn snapshot(&self) -> Result<Game, SessionError> {
        Ok(self.lock()?.game.clone())
    }

    /// A poisoned game counts as inactive.
    pub fn is_active(&self) -> bool {
        self.lock().map(|slot| slot.game.is_active()).unwrap_or(false)
    }

    /// Finish time of a finished game.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lock().ok()?.game.finished_at()
    }

    /// Cancels pending forfeit timers before the game is dropped.
    pub fn release(&self) {
        if let Ok(mut slot) = self.lock() {
            slot.cancel_timers();
        }
    }
}
