use serde::{Deserialize, Serialize};

use crate::models::{Directory, UserId};

/// Full-state update shared between every subscriber of the sync channel.
/// There are no deltas: each event carries the whole directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEvent {
    UpdateGroups(Directory),
}

impl SyncEvent {
    pub fn into_directory(self) -> Directory {
        match self {
            Self::UpdateGroups(directory) => directory,
        }
    }
}

/// Events sent over the WebSocket sync gateway, ahead of the forwarded
/// `SyncEvent` stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEvent {
    /// Server confirms authentication and hands over the current directory
    Ready {
        user_id: UserId,
        username: String,
        groups: Directory,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_groups_wire_shape() {
        let event = SyncEvent::UpdateGroups(Directory::default());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "UPDATE_GROUPS", "payload": [] }));
    }

    #[test]
    fn identify_parses() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"IDENTIFY","payload":{"token":"abc"}}"#).unwrap();
        let GatewayCommand::Identify { token } = cmd;
        assert_eq!(token, "abc");
    }
}
