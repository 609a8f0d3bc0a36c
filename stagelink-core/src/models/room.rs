use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{RoomId, UserId};

/// Room type, fixed at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// Meeting/education style room with free-to-take or apply-to-take
    /// speaking modes
    Conference,
    /// Streaming style room
    Live,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conference => "conference",
            Self::Live => "live",
        }
    }

    /// Per-device limit of simultaneously joined rooms of this type
    pub const fn joined_room_limit(&self) -> usize {
        match self {
            Self::Conference => 1,
            Self::Live => 3,
        }
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conference" => Ok(Self::Conference),
            "live" => Ok(Self::Live),
            _ => Err(format!("Unknown room type: {s}")),
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Seat taking mode, effective only when seat control is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SeatMode {
    /// Audience members take seats freely, no approval needed
    #[default]
    FreeToTake,
    /// Taking a seat requires owner/administrator approval
    ApplyToTake,
}

impl SeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeToTake => "free_to_take",
            Self::ApplyToTake => "apply_to_take",
        }
    }
}

impl std::fmt::Display for SeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a room was dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissedReason {
    ByOwner,
    ByServer,
}

/// Why a user was removed from a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickedOutReason {
    /// Kicked by the owner or an administrator
    ByAdmin,
    /// The same account entered the room from another device
    LoggedOnOtherDevice,
    /// Removed by the server
    ByServer,
    /// Evicted because the per-device joined-room limit was exceeded
    JoinedRoomCountExceedLimit,
}

/// Room state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: RoomId,

    /// Room creator, highest-privilege member (read-only after creation)
    pub owner_id: UserId,
    pub owner_name: String,
    pub owner_avatar_url: String,

    /// Immutable after creation
    pub room_type: RoomType,

    /// Display name, defaults to the room id
    pub name: String,

    pub is_camera_disable_for_all_user: bool,
    pub is_microphone_disable_for_all_user: bool,
    pub is_screen_share_disable_for_all_user: bool,
    pub is_message_disable_for_all_user: bool,

    /// Whether seat control is enabled
    pub is_seat_enabled: bool,
    /// Effective only when seat control is enabled
    pub seat_mode: SeatMode,
    pub max_seat_count: usize,

    pub password: String,

    pub create_time: DateTime<Utc>,
    pub member_count: usize,
}

impl RoomInfo {
    /// New room description with defaults matching an open conference
    pub fn new(room_id: RoomId, room_type: RoomType) -> Self {
        let name = room_id.as_str().to_string();
        Self {
            room_id,
            owner_id: UserId::from_string(String::new()),
            owner_name: String::new(),
            owner_avatar_url: String::new(),
            room_type,
            name,
            is_camera_disable_for_all_user: false,
            is_microphone_disable_for_all_user: false,
            is_screen_share_disable_for_all_user: false,
            is_message_disable_for_all_user: false,
            is_seat_enabled: false,
            seat_mode: SeatMode::FreeToTake,
            max_seat_count: 0,
            password: String::new(),
            create_time: Utc::now(),
            member_count: 0,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Extra parameters for entering a room
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnterRoomOptions {
    /// Room password, required when the room has one
    pub password: String,
}
