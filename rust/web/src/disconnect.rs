//! Disconnect grace periods, forfeits and reconnection.

use crate::broadcast::broadcast;
use crate::connection::{Connection, ConnectionId};
use crate::game::GameHandle;
use crate::persistence::MatchRecorder;
use crate::protocol::ServerMessage;
use crate::registry::GameRegistry;
use crate::session::SessionError;
use crate::telemetry::{EventType, Telemetry, TelemetryEvent};
use crate::timer::Timer;
use fourinrow_engine::game::Outcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct DisconnectController {
    registry: Arc<GameRegistry>,
    recorder: MatchRecorder,
    telemetry: Telemetry,
    grace_period: Duration,
    generation: AtomicU64,
}

impl DisconnectController {
    pub fn new(
        registry: Arc<GameRegistry>,
        recorder: MatchRecorder,
        telemetry: Telemetry,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            recorder,
            telemetry,
            grace_period,
            generation: AtomicU64::new(0),
        }
    }

    /// Handles the end of `name`'s connection `connection_id`.
    ///
    /// Returns `true` when a grace timer was armed. Connections that are no
    /// longer bound to their seat are ignored.
    pub fn on_disconnect(
        self: &Arc<Self>,
        name: &str,
        connection_id: ConnectionId,
    ) -> Result<bool, SessionError> {
        let Some(handle) = self.registry.find_active_by_participant(name) else {
            return Ok(false);
        };

        let mut slot = handle.lock()?;
        if !slot.game().is_active() {
            return Ok(false);
        }
        let Some(participant_id) = slot.id_for_name(name) else {
            tracing::warn!(game_id = %handle.id(), participant = %name, "disconnect for unseated participant");
            return Ok(false);
        };
        if slot.connection_id(&participant_id) != Some(connection_id) {
            tracing::debug!(
                game_id = %handle.id(),
                participant = %name,
                connection_id,
                "stale connection closed; seat already rebound"
            );
            return Ok(false);
        }

        slot.mark_disconnected(&participant_id);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let controller = Arc::clone(self);
        let game = Arc::clone(&handle);
        let seat = participant_id.clone();
        let timer = Timer::spawn(generation, self.grace_period, move || {
            controller.expire(&game, &seat, generation);
        });
        if let Some(previous) = slot.replace_forfeit_timer(&participant_id, timer) {
            previous.cancel();
        }
        drop(slot);

        tracing::info!(
            game_id = %handle.id(),
            participant = %name,
            grace_ms = self.grace_period.as_millis() as u64,
            "participant disconnected"
        );
        self.telemetry.emit(TelemetryEvent::new(
            EventType::PlayerDisconnected,
            handle.id(),
            name,
        ));
        Ok(true)
    }

    /// Rebinds `name` to `connection` in `handle`'s game and resends `start`
    /// and `update` to it. Returns `false` when the game is no longer active.
    pub fn reconnect(
        &self,
        handle: &GameHandle,
        name: &str,
        connection: Connection,
    ) -> Result<bool, SessionError> {
        let mut slot = handle.lock()?;
        if !slot.game().is_active() {
            return Ok(false);
        }
        let participant_id = slot
            .id_for_name(name)
            .ok_or_else(|| SessionError::ParticipantNotSeated(name.to_string()))?;

        if let Some(timer) = slot.take_forfeit_timer(&participant_id) {
            timer.cancel();
        }
        slot.bind(&participant_id, connection);

        if let Some(payload) = slot.start_payload(&participant_id) {
            slot.send_to(&participant_id, ServerMessage::Start(payload));
        }
        slot.send_to(&participant_id, ServerMessage::Update(slot.game().clone()));
        drop(slot);

        tracing::info!(game_id = %handle.id(), participant = %name, "participant reconnected");
        self.telemetry.emit(TelemetryEvent::new(
            EventType::PlayerReconnected,
            handle.id(),
            name,
        ));
        Ok(true)
    }

    fn expire(&self, handle: &GameHandle, participant_id: &str, generation: u64) {
        let finished = {
            let mut slot = match handle.lock() {
                Ok(slot) => slot,
                Err(err) => {
                    tracing::error!(game_id = %handle.id(), error = %err, "cannot resolve forfeit");
                    return;
                }
            };
            if slot.forfeit_generation(participant_id) != Some(generation) {
                return;
            }
            slot.take_forfeit_timer(participant_id);

            let still_away = slot
                .game()
                .participant(participant_id)
                .is_some_and(|participant| !participant.is_connected());
            if !still_away || !slot.game().is_active() {
                return;
            }
            let Some(opponent) = slot
                .game()
                .opponent_of(participant_id)
                .map(|participant| participant.id().to_string())
            else {
                return;
            };

            if !slot.game_mut().finish(Outcome::Forfeit {
                participant: opponent,
                forfeited: participant_id.to_string(),
            }) {
                return;
            }
            broadcast(&slot);
            slot.game().clone()
        };

        tracing::info!(game_id = %handle.id(), participant_id = %participant_id, "participant forfeited");
        self.telemetry.emit(TelemetryEvent::new(
            EventType::GameForfeited,
            handle.id(),
            participant_id,
        ));
        self.recorder.game_over(&finished);
    }
}
