pub mod handler;
pub mod msg_code_handler;
pub mod msg_disconnect_handler;
pub mod msg_join_handler;
pub mod msg_language_handler;
pub mod msg_ping_handler;
