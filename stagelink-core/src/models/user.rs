use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::id::UserId;

/// Room role. Exactly one per member; the owner is unique per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Room creator, highest privilege
    Owner,
    /// Room administrator
    Administrator,
    /// Regular member
    GeneralUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Administrator => "administrator",
            Self::GeneralUser => "general_user",
        }
    }

    /// Owner and administrators are allowed privileged mutations
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "administrator" => Ok(Self::Administrator),
            "general_user" => Ok(Self::GeneralUser),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who triggered an audio/video state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// The user themselves
    BySelf,
    /// The owner or an administrator
    ByAdmin,
}

/// Per-room view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: UserId,
    pub user_name: String,

    /// Per-room display name
    pub name_card: String,

    pub avatar_url: String,

    pub role: Role,

    pub has_audio_stream: bool,
    pub has_video_stream: bool,
    pub has_screen_stream: bool,

    pub is_message_disabled: bool,

    /// Room-scoped custom key-value blob
    pub custom_info: HashMap<String, Vec<u8>>,
}

impl UserInfo {
    pub fn new(user_id: UserId, user_name: String) -> Self {
        Self {
            user_id,
            user_name,
            name_card: String::new(),
            avatar_url: String::new(),
            role: Role::GeneralUser,
            has_audio_stream: false,
            has_video_stream: false,
            has_screen_stream: false,
            is_message_disabled: false,
            custom_info: HashMap::new(),
        }
    }

    /// Display name: name card when set, otherwise the user name
    pub fn display_name(&self) -> &str {
        if self.name_card.is_empty() {
            &self.user_name
        } else {
            &self.name_card
        }
    }
}

/// Self profile held by the session manager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginUserInfo {
    pub user_id: UserId,
    pub user_name: String,
    pub avatar_url: String,
}
