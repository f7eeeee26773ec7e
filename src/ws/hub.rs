use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::models::{ConnectionId, Delivery, ReceivedMessage, SendMessage};
use crate::websocket::msg_code_handler::{handle_code_change_message, handle_sync_code_message};
use crate::websocket::msg_disconnect_handler::handle_disconnect;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_language_handler::handle_language_change_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::ws::registry::ConnectionRegistry;

pub type Outbox = mpsc::UnboundedSender<SendMessage>;

struct HubState {
    registry: ConnectionRegistry,
    outboxes: HashMap<ConnectionId, Outbox>,
}

/// Owns the connection registry and the per-connection outboxes.
///
/// Each inbound event is handled and its deliveries queued under one lock,
/// so every peer observes membership changes in the same order.
pub struct RoomHub {
    state: Mutex<HubState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub connections: usize,
    pub rooms: usize,
    pub participants: usize,
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                registry: ConnectionRegistry::new(),
                outboxes: HashMap::new(),
            }),
        }
    }

    /// Register a new connection and return its id and outbound queue
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<SendMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let connection_id = state.registry.connect();
        state.outboxes.insert(connection_id.clone(), tx);
        (connection_id, rx)
    }

    /// Apply one inbound event and queue its deliveries
    pub async fn handle(&self, connection_id: &ConnectionId, message: &ReceivedMessage) -> usize {
        let mut state = self.state.lock().await;
        let deliveries = match message {
            ReceivedMessage::Join(join_msg) => handle_join_message(join_msg, connection_id, &mut state.registry),
            ReceivedMessage::CodeChange(code_msg) => handle_code_change_message(code_msg, connection_id, &state.registry),
            ReceivedMessage::SyncCode(sync_msg) => handle_sync_code_message(sync_msg, connection_id, &state.registry),
            ReceivedMessage::LanguageChange(language_msg) => handle_language_change_message(language_msg, connection_id, &state.registry),
            ReceivedMessage::Ping(ping_msg) => handle_ping_message(ping_msg, connection_id),
        };
        state.dispatch(deliveries)
    }

    /// Remove the connection and notify the rooms it was in
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> usize {
        let mut state = self.state.lock().await;
        let deliveries = handle_disconnect(connection_id, &mut state.registry);
        state.outboxes.remove(connection_id);
        state.dispatch(deliveries)
    }

    pub async fn stats(&self) -> HubStats {
        let state = self.state.lock().await;
        HubStats {
            connections: state.registry.connection_count(),
            rooms: state.registry.room_count(),
            participants: state.registry.participant_count(),
        }
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl HubState {
    fn dispatch(&self, deliveries: Vec<Delivery>) -> usize {
        let mut sent = 0;
        for delivery in deliveries {
            let Some(outbox) = self.outboxes.get(&delivery.target) else {
                warn!("No outbox for connection {}", delivery.target);
                continue;
            };
            if outbox.send(delivery.message).is_err() {
                debug!("Outbox of {} is closed", delivery.target);
                continue;
            }
            sent += 1;
        }
        sent
    }
}
