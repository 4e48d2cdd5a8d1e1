use crate::game::GameSlot;
use crate::protocol::ServerMessage;

/// Sends the current snapshot to every connected human seat of `slot`.
/// Returns how many seats it reached.
pub fn broadcast(slot: &GameSlot) -> usize {
    let game = slot.game();
    let delivered = game
        .participants()
        .iter()
        .filter(|participant| participant.is_connected() && !participant.is_automated())
        .filter(|participant| slot.send_to(participant.id(), ServerMessage::Update(game.clone())))
        .count();
    tracing::trace!(game_id = %game.id(), delivered, "broadcast snapshot");
    delivered
}
