use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

/// Media device kinds an admin can control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDevice {
    Microphone,
    Camera,
    ScreenSharing,
}

/// Device state of a seated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum DeviceStatus {
    #[default]
    Opened,
    /// Closed by the user themselves
    ClosedBySelf,
    /// Force-closed by the owner or an administrator
    ClosedByAdmin,
}

/// Policy when moving a user onto an occupied seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum MoveSeatPolicy {
    /// Give up when the target seat is occupied (default)
    #[default]
    AbortWhenOccupied,
    /// Evict the current occupant, then place the moved user
    ForceReplace,
    /// Exchange the two users' seats atomically
    SwapPosition,
}

/// Per-index seat record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInfo {
    pub room_id: RoomId,
    pub index: usize,

    /// Occupant, empty when the seat is vacant
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub name_card: Option<String>,
    pub avatar_url: Option<String>,

    pub is_locked: bool,
    pub is_video_locked: bool,
    pub is_audio_locked: bool,
}

impl SeatInfo {
    pub fn vacant(room_id: RoomId, index: usize) -> Self {
        Self {
            room_id,
            index,
            user_id: None,
            user_name: None,
            name_card: None,
            avatar_url: None,
            is_locked: false,
            is_video_locked: false,
            is_audio_locked: false,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.user_id.is_some()
    }

    pub(crate) fn occupy(&mut self, user_id: UserId, user_name: String, avatar_url: String) {
        self.user_id = Some(user_id);
        self.user_name = Some(user_name);
        self.avatar_url = Some(avatar_url);
    }

    pub(crate) fn vacate(&mut self) {
        self.user_id = None;
        self.user_name = None;
        self.name_card = None;
        self.avatar_url = None;
    }
}

/// Lock toggles for a seat; the three bits are independent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeatLockParams {
    pub lock_seat: bool,
    pub lock_video: bool,
    pub lock_audio: bool,
}
