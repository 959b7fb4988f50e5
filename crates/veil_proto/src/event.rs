//! Real-time channel events, pushed to a connected recipient client.

use serde::{Deserialize, Serialize};

use crate::envelope::PersistedMessage;

/// Events emitted over a recipient's push channel.  The payload of
/// `newMessage` is the persisted-message shape — still encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "newMessage")]
    NewMessage(PersistedMessage),
}

impl ServerEvent {
    /// Wire event name, as consumed by recipient clients.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "newMessage",
        }
    }
}
