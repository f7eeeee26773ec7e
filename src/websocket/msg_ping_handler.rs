use tracing::debug;
use chrono::Utc;
use crate::models::{ConnectionId, Delivery, PingMessage, PongMessage, SendMessage};

/// Handle PingMessage
pub fn handle_ping_message(_ping_msg: &PingMessage, connection_id: &ConnectionId) -> Vec<Delivery> {
    // Reply with pong to the sender only
    debug!("Ping message received from {}", connection_id);
    vec![Delivery::new(
        connection_id.clone(),
        SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() }),
    )]
}
