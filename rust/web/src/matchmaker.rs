//! Pairs joining players, or seats them against the automated opponent once
//! the matchmaking timeout runs out.
//!
//! All transitions, including timer callbacks, run under one mutex. A timer
//! only acts if the waiting slot still carries the generation it was armed
//! with.

use crate::broadcast::broadcast;
use crate::connection::{Connection, ConnectionId};
use crate::disconnect::DisconnectController;
use crate::game::{GameHandle, GameSlot, SeatLink};
use crate::protocol::ServerMessage;
use crate::registry::GameRegistry;
use crate::session::SessionError;
use crate::telemetry::{EventType, Telemetry, TelemetryEvent};
use crate::timer::Timer;
use fourinrow_engine::game::{Game, GameId};
use fourinrow_engine::player::{Color, Participant};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Display name of the automated seat.
pub const BOT_NAME: &str = "Bot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Rebound to an active game
    Reconnected(GameId),
    Waiting,
    Matched(GameId),
}

#[derive(Debug)]
struct WaitingSlot {
    participant: Participant,
    connection: Connection,
    timer: Timer,
}

#[derive(Debug, Default)]
struct MatchState {
    waiting: Option<WaitingSlot>,
    generation: u64,
}

#[derive(Debug)]
pub struct Matchmaker {
    state: Mutex<MatchState>,
    registry: Arc<GameRegistry>,
    disconnects: Arc<DisconnectController>,
    telemetry: Telemetry,
    timeout: Duration,
    waiting_message: String,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<GameRegistry>,
        disconnects: Arc<DisconnectController>,
        telemetry: Telemetry,
        timeout: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(MatchState::default()),
            registry,
            disconnects,
            telemetry,
            timeout,
            waiting_message: waiting_message(timeout),
        }
    }

    pub fn join(
        self: &Arc<Self>,
        name: &str,
        connection: Connection,
    ) -> Result<JoinOutcome, SessionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SessionError::StoragePoisoned)?;

        if let Some(handle) = self.registry.find_active_by_participant(name) {
            if self.disconnects.reconnect(&handle, name, connection.clone())? {
                return Ok(JoinOutcome::Reconnected(handle.id().to_string()));
            }
        }

        match state.waiting.take() {
            Some(mut waiting) if waiting.participant.name() == name => {
                waiting.timer.cancel();
                waiting.timer = self.arm_timeout(&mut state);
                waiting.connection = connection;
                waiting
                    .connection
                    .send(ServerMessage::Waiting(self.waiting_message.clone()));
                tracing::debug!(participant = %name, "waiting participant replaced its connection");
                state.waiting = Some(waiting);
                Ok(JoinOutcome::Waiting)
            }
            Some(waiting) => {
                waiting.timer.cancel();
                let joiner = Participant::human(Uuid::new_v4().to_string(), name, Color::Two);
                let game_id = self.start_game(waiting, joiner, Some(connection))?;
                Ok(JoinOutcome::Matched(game_id))
            }
            None => {
                let timer = self.arm_timeout(&mut state);
                connection.send(ServerMessage::Waiting(self.waiting_message.clone()));
                state.waiting = Some(WaitingSlot {
                    participant: Participant::human(Uuid::new_v4().to_string(), name, Color::One),
                    connection,
                    timer,
                });
                tracing::info!(participant = %name, "participant waiting for opponent");
                Ok(JoinOutcome::Waiting)
            }
        }
    }

    /// Clears the waiting slot if it still holds `name` on `connection_id`.
    pub fn withdraw(&self, name: &str, connection_id: ConnectionId) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let holds = state.waiting.as_ref().is_some_and(|waiting| {
            waiting.participant.name() == name && waiting.connection.id() == connection_id
        });
        if !holds {
            return false;
        }
        if let Some(waiting) = state.waiting.take() {
            waiting.timer.cancel();
        }
        tracing::info!(participant = %name, "waiting participant left before pairing");
        true
    }

    pub fn waiting_name(&self) -> Option<String> {
        let state = self.state.lock().ok()?;
        state
            .waiting
            .as_ref()
            .map(|waiting| waiting.participant.name().to_string())
    }

    fn arm_timeout(self: &Arc<Self>, state: &mut MatchState) -> Timer {
        state.generation += 1;
        let generation = state.generation;
        let matchmaker = Arc::clone(self);
        Timer::spawn(generation, self.timeout, move || {
            matchmaker.on_timeout(generation);
        })
    }

    fn on_timeout(&self, generation: u64) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                tracing::error!("matchmaker state poisoned; dropping timeout");
                return;
            }
        };
        let current = state
            .waiting
            .as_ref()
            .is_some_and(|waiting| waiting.timer.generation() == generation);
        if !current {
            return;
        }
        let Some(waiting) = state.waiting.take() else {
            return;
        };

        let name = waiting.participant.name().to_string();
        let bot = Participant::automated(Uuid::new_v4().to_string(), BOT_NAME, Color::Two);
        if let Err(err) = self.start_game(waiting, bot, None) {
            tracing::error!(participant = %name, error = %err, "failed to start game against automated opponent");
        }
    }

    /// Seats `waiting` first and `second` after it, registers the game and
    /// announces it. `second_connection` is `None` for the automated seat.
    fn start_game(
        &self,
        waiting: WaitingSlot,
        second: Participant,
        second_connection: Option<Connection>,
    ) -> Result<GameId, SessionError> {
        let WaitingSlot {
            participant: first,
            connection: first_connection,
            ..
        } = waiting;
        let automated = second.is_automated();
        let game_id = Uuid::new_v4().to_string();

        let mut links = HashMap::new();
        links.insert(first.id().to_string(), SeatLink::bound(first_connection));
        if let Some(connection) = second_connection {
            links.insert(second.id().to_string(), SeatLink::bound(connection));
        }
        let game = Game::new(game_id.clone(), first, second);
        let handle = Arc::new(GameHandle::new(GameSlot::new(game, links)));
        self.registry.add(Arc::clone(&handle))?;

        {
            let slot = handle.lock()?;
            slot.announce_start();
            broadcast(&slot);
        }

        let detail = if automated { "pve" } else { "pvp" };
        tracing::info!(game_id = %game_id, players = ?handle.human_names(), mode = detail, "game started");
        self.telemetry.emit(TelemetryEvent::new(
            EventType::GameStarted,
            game_id.as_str(),
            detail,
        ));
        Ok(game_id)
    }
}

/// Seconds are shown with a fraction only when the timeout has one.
fn waiting_message(timeout: Duration) -> String {
    format!("Looking for opponent... ({}s)", timeout.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_message_shows_sub_second_timeouts() {
        assert_eq!(
            waiting_message(Duration::from_secs(10)),
            "Looking for opponent... (10s)"
        );
        assert_eq!(
            waiting_message(Duration::from_millis(150)),
            "Looking for opponent... (0.15s)"
        );
    }
}
