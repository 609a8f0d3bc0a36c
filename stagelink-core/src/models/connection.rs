use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

/// Per-room result of a connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionCode {
    Unknown,
    /// Request dispatched
    Success,
    /// Invited room does not exist
    RoomNotExist,
    /// Invited room is already connected with us or already invited
    Connecting,
    /// Invited room is connecting with another room
    ConnectingOtherRoom,
    /// Connected room count reached the maximum
    Full,
    /// Internal error, a retry is reasonable
    Retry,
}

/// A live room participating in a cross-room connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionUser {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub avatar_url: String,
    /// When this room joined the connection
    pub join_connection_time: DateTime<Utc>,
}

impl ConnectionUser {
    pub fn new(room_id: RoomId, user_id: UserId, user_name: String) -> Self {
        Self {
            room_id,
            user_id,
            user_name,
            avatar_url: String::new(),
            join_connection_time: Utc::now(),
        }
    }
}
