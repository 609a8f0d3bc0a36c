use serde::{Deserialize, Serialize};

use super::user::UserInfo;

/// Conference invitation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum InvitationStatus {
    #[default]
    None,
    Pending,
    Timeout,
    Accepted,
    Rejected,
}

/// Per-invitee result of an invite call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationCode {
    Success,
    /// The user already has a pending invitation to this room
    AlreadyInInvitationList,
    /// The user is already in the room
    AlreadyInConference,
}

/// Why an invitee rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationRejectedReason {
    /// Declined to enter
    RejectToEnter,
    /// Busy in another conference
    InOtherConference,
}

/// A tracked conference invitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub status: InvitationStatus,
    pub inviter: UserInfo,
    pub invitee: UserInfo,
}

impl Invitation {
    pub fn new(inviter: UserInfo, invitee: UserInfo) -> Self {
        Self {
            status: InvitationStatus::Pending,
            inviter,
            invitee,
        }
    }
}
