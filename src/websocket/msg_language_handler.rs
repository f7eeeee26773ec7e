use tracing::info;
use crate::models::{ConnectionId, Delivery, LanguageChangeMessage, LanguageUpdateMessage, SendMessage};
use crate::ws::registry::ConnectionRegistry;

/// Handle LanguageChangeMessage
pub fn handle_language_change_message(language_msg: &LanguageChangeMessage, connection_id: &ConnectionId, registry: &ConnectionRegistry) -> Vec<Delivery> {

    info!("Language change for room {} from {}: {}", language_msg.room_id, connection_id, language_msg.language);

    let update = LanguageUpdateMessage { language: language_msg.language.clone() };
    registry
        .members(&language_msg.room_id)
        .iter()
        .filter(|member| *member != connection_id)
        .map(|member| Delivery::new(member.clone(), SendMessage::LanguageChange(update.clone())))
        .collect()
}
