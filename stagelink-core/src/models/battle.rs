use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{generate_id, RoomId, UserId};

/// Battle ID type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BattleId(pub String);

impl BattleId {
    #[must_use]
    pub fn new() -> Self {
        Self(generate_id())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BattleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-room result of a battle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleCode {
    Unknown,
    /// Request dispatched
    Success,
    /// Invited room does not exist
    RoomNotExist,
    /// Invited room is already battling with us
    Battling,
    /// Invited room is battling with another room
    BattlingOtherRoom,
    /// Invited room has left the connection
    RoomExit,
    /// Internal error, a retry is reasonable
    Retry,
}

/// Why a battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStoppedReason {
    /// Maximum duration reached
    TimeOver,
    /// Everyone else exited
    OtherExit,
}

/// A room competing in a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleUser {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub avatar_url: String,
    pub score: u64,
}

impl BattleUser {
    pub fn new(room_id: RoomId, user_id: UserId, user_name: String) -> Self {
        Self {
            room_id,
            user_id,
            user_name,
            avatar_url: String::new(),
            score: 0,
        }
    }
}

/// Battle parameters chosen by the initiator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Maximum battle duration in seconds
    pub duration_secs: u64,
    /// Whether invitees must explicitly accept/reject
    pub need_response: bool,
    pub extension_info: String,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            duration_secs: 300,
            need_response: true,
            extension_info: String::new(),
        }
    }
}

/// Battle state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleInfo {
    pub battle_id: BattleId,
    pub config: BattleConfig,
    pub inviter: BattleUser,
    pub invitee_list: Vec<BattleUser>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl BattleInfo {
    pub fn new(config: BattleConfig, inviter: BattleUser, invitee_list: Vec<BattleUser>) -> Self {
        Self {
            battle_id: BattleId::new(),
            config,
            inviter,
            invitee_list,
            start_time: None,
            end_time: None,
        }
    }
}
