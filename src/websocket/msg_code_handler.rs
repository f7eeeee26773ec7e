use tracing::{debug, info};
use crate::models::{CodeChangeMessage, CodeUpdateMessage, ConnectionId, Delivery, SendMessage, SyncCodeMessage};
use crate::ws::registry::ConnectionRegistry;

/// Handle CodeChangeMessage: full document to every room member but the sender
pub fn handle_code_change_message(code_msg: &CodeChangeMessage, connection_id: &ConnectionId, registry: &ConnectionRegistry) -> Vec<Delivery> {

    debug!("Code change received for room {} from {} ({} bytes)", code_msg.room_id, connection_id, code_msg.code.as_deref().map_or(0, str::len));

    let update = CodeUpdateMessage { code: code_msg.code.clone() };
    registry
        .members(&code_msg.room_id)
        .iter()
        .filter(|member| *member != connection_id)
        .map(|member| Delivery::new(member.clone(), SendMessage::CodeChange(update.clone())))
        .collect()
}

/// Handle SyncCodeMessage: point-to-point catch-up, delivered as a code change
pub fn handle_sync_code_message(sync_msg: &SyncCodeMessage, connection_id: &ConnectionId, registry: &ConnectionRegistry) -> Vec<Delivery> {

    if !registry.is_connected(&sync_msg.connection_id) {
        info!("Sync code from {} targets unknown connection {}", connection_id, sync_msg.connection_id);
        return Vec::new();
    }

    debug!("Sync code from {} to {}", connection_id, sync_msg.connection_id);
    vec![Delivery::new(
        sync_msg.connection_id.clone(),
        SendMessage::CodeChange(CodeUpdateMessage { code: sync_msg.code.clone() }),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_of(registry: &mut ConnectionRegistry, size: usize) -> Vec<ConnectionId> {
        (0..size)
            .map(|i| {
                let connection = registry.connect();
                registry.join(&connection, "room", Some(format!("user{i}")));
                connection
            })
            .collect()
    }

    #[test]
    fn code_change_skips_the_sender() {
        let mut registry = ConnectionRegistry::new();
        let members = room_of(&mut registry, 4);
        let msg = CodeChangeMessage { room_id: "room".to_string(), code: Some("int main() {}".to_string()) };

        let deliveries = handle_code_change_message(&msg, &members[1], &registry);

        assert_eq!(deliveries.len(), 3);
        assert!(deliveries.iter().all(|d| d.target != members[1]));
        assert!(deliveries.iter().all(|d| d.message
            == SendMessage::CodeChange(CodeUpdateMessage { code: Some("int main() {}".to_string()) })));
    }

    #[test]
    fn code_change_to_unknown_room_goes_nowhere() {
        let mut registry = ConnectionRegistry::new();
        let members = room_of(&mut registry, 2);
        let msg = CodeChangeMessage { room_id: "other".to_string(), code: Some("x".to_string()) };
        assert!(handle_code_change_message(&msg, &members[0], &registry).is_empty());
    }

    #[test]
    fn sync_code_targets_exactly_one_connection() {
        let mut registry = ConnectionRegistry::new();
        let members = room_of(&mut registry, 3);
        let msg = SyncCodeMessage { connection_id: members[2].clone(), code: Some("print(1)".to_string()) };

        let deliveries = handle_sync_code_message(&msg, &members[0], &registry);

        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].target, members[2]);
    }

    #[test]
    fn sync_code_forwards_null_and_ignores_unknown_targets() {
        let mut registry = ConnectionRegistry::new();
        let members = room_of(&mut registry, 2);

        let null_sync = SyncCodeMessage { connection_id: members[1].clone(), code: None };
        let deliveries = handle_sync_code_message(&null_sync, &members[0], &registry);
        assert_eq!(deliveries[0].message, SendMessage::CodeChange(CodeUpdateMessage { code: None }));

        let lost = SyncCodeMessage { connection_id: ConnectionId::from("gone"), code: Some("x".to_string()) };
        assert!(handle_sync_code_message(&lost, &members[0], &registry).is_empty());
    }
}
