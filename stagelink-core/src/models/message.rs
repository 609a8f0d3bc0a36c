use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::RoomId;
use super::user::UserInfo;

/// Plain text room message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessage {
    pub room_id: RoomId,
    pub sender: UserInfo,
    /// Room-scoped monotonically increasing sequence
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub text_content: String,
    pub extension_info: HashMap<String, String>,
}

/// Application-defined room message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomMessage {
    pub room_id: RoomId,
    pub sender: UserInfo,
    /// Room-scoped monotonically increasing sequence
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Routing key for the receiving application
    pub business_id: String,
    pub data: String,
}
