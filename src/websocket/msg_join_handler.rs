use tracing::info;
use crate::models::{ConnectionId, Delivery, JoinMessage, JoinedMessage, SendMessage};
use crate::ws::registry::ConnectionRegistry;

/// Handle JoinMessage
pub fn handle_join_message(join_msg: &JoinMessage, connection_id: &ConnectionId, registry: &mut ConnectionRegistry) -> Vec<Delivery> {

    info!("Join message received for room {}: user={:?}, connection={}", join_msg.room_id, join_msg.username, connection_id);

    // Membership snapshot taken right after the join
    let clients = registry.join(connection_id, &join_msg.room_id, join_msg.username.clone());

    // Every member, the joiner included, learns the new list
    let joined = JoinedMessage {
        clients: clients.clone(),
        username: join_msg.username.clone(),
        connection_id: connection_id.clone(),
    };
    clients
        .into_iter()
        .map(|client| Delivery::new(client.connection_id, SendMessage::Joined(joined.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(room_id: &str, username: &str) -> JoinMessage {
        JoinMessage { room_id: room_id.to_string(), username: Some(username.to_string()) }
    }

    #[test]
    fn joined_fans_out_to_every_member_including_joiner() {
        let mut registry = ConnectionRegistry::new();
        let a = registry.connect();
        let b = registry.connect();
        let c = registry.connect();

        handle_join_message(&join("room", "ada"), &a, &mut registry);
        handle_join_message(&join("room", "bob"), &b, &mut registry);
        let deliveries = handle_join_message(&join("room", "cat"), &c, &mut registry);

        let targets: Vec<_> = deliveries.iter().map(|d| d.target.clone()).collect();
        assert_eq!(targets, vec![a, b, c.clone()]);
        for delivery in deliveries {
            match delivery.message {
                SendMessage::Joined(joined) => {
                    assert_eq!(joined.connection_id, c);
                    assert_eq!(joined.username.as_deref(), Some("cat"));
                    assert_eq!(joined.clients.len(), 3);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[test]
    fn joined_list_matches_server_membership() {
        let mut registry = ConnectionRegistry::new();
        let a = registry.connect();
        let b = registry.connect();
        let other = registry.connect();
        handle_join_message(&join("room", "ada"), &a, &mut registry);
        handle_join_message(&join("elsewhere", "eve"), &other, &mut registry);
        let deliveries = handle_join_message(&join("room", "bob"), &b, &mut registry);

        let SendMessage::Joined(joined) = &deliveries[0].message else {
            panic!("expected joined");
        };
        assert_eq!(joined.clients, registry.participants("room"));
        assert!(deliveries.iter().all(|d| d.target != other));
    }
}
