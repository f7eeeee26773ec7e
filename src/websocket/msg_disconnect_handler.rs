use tracing::info;
use crate::models::{ConnectionId, Delivery, DisconnectedMessage, SendMessage};
use crate::ws::registry::ConnectionRegistry;

/// Handle a closing connection: one notice per room, to the members left behind
pub fn handle_disconnect(connection_id: &ConnectionId, registry: &mut ConnectionRegistry) -> Vec<Delivery> {

    let (rooms, username) = registry.disconnect(connection_id);
    info!("Connection {} ({:?}) left {} room(s)", connection_id, username, rooms.len());

    let notice = DisconnectedMessage {
        connection_id: connection_id.clone(),
        username,
    };
    rooms
        .into_iter()
        .flat_map(|(_, remaining)| remaining)
        .map(|member| Delivery::new(member, SendMessage::Disconnected(notice.clone())))
        .collect()
}
