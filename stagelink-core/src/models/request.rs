use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RequestId, UserId};
use crate::error::Error;

/// What a signaling request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    /// Ask a remote user to open their camera
    OpenRemoteCamera,
    /// Ask a remote user to open their microphone
    OpenRemoteMicrophone,
    /// Apply to take a seat
    TakeSeat,
    /// Invite a remote user onto a seat
    RemoteUserOnSeat,
    /// Apply to the admins to open the local camera
    ApplyToAdminToOpenLocalCamera,
    /// Apply to the admins to open the local microphone
    ApplyToAdminToOpenLocalMicrophone,
    /// Apply to the admins to open local screen sharing
    ApplyToAdminToOpenLocalScreenShare,
}

impl RequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRemoteCamera => "open_remote_camera",
            Self::OpenRemoteMicrophone => "open_remote_microphone",
            Self::TakeSeat => "take_seat",
            Self::RemoteUserOnSeat => "remote_user_on_seat",
            Self::ApplyToAdminToOpenLocalCamera => "apply_to_admin_to_open_local_camera",
            Self::ApplyToAdminToOpenLocalMicrophone => "apply_to_admin_to_open_local_microphone",
            Self::ApplyToAdminToOpenLocalScreenShare => "apply_to_admin_to_open_local_screen_share",
        }
    }
}

impl std::fmt::Display for RequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request lifecycle state.
///
/// `Pending` transitions to exactly one of the five terminal states and
/// never moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    TimedOut,
    Errored,
}

impl RequestState {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Terminal resolution of a tracked request, delivered exactly once per
/// request through its handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Accepted by `user_id`
    Accepted { user_id: UserId },
    /// Rejected by `user_id` with an optional free-form message
    Rejected { user_id: UserId, message: String },
    /// Cancelled by the issuer
    Cancelled,
    /// The timeout supervisor fired before any response
    TimedOut,
    /// Failed while dispatching or processing
    Errored { error: Error },
}

impl RequestOutcome {
    pub const fn state(&self) -> RequestState {
        match self {
            Self::Accepted { .. } => RequestState::Accepted,
            Self::Rejected { .. } => RequestState::Rejected,
            Self::Cancelled => RequestState::Cancelled,
            Self::TimedOut => RequestState::TimedOut,
            Self::Errored { .. } => RequestState::Errored,
        }
    }
}

/// Tracked signaling request snapshot.
///
/// Owned by the request tracker; callers and observers hold clones and
/// never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub action: RequestAction,

    /// Issuer identity and display metadata
    pub user_id: UserId,
    pub user_name: String,
    pub name_card: String,
    pub avatar_url: String,

    /// Free-form payload, action-specific
    pub content: String,

    pub timestamp: DateTime<Utc>,
}

impl Request {
    pub fn new(action: RequestAction, user_id: UserId, content: String) -> Self {
        Self {
            request_id: RequestId::new(),
            action,
            user_id,
            user_name: String::new(),
            name_card: String::new(),
            avatar_url: String::new(),
            content,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RequestState::Pending.is_terminal());
        assert!(RequestState::Accepted.is_terminal());
        assert!(RequestState::Rejected.is_terminal());
        assert!(RequestState::Cancelled.is_terminal());
        assert!(RequestState::TimedOut.is_terminal());
        assert!(RequestState::Errored.is_terminal());
    }

    #[test]
    fn test_outcome_state_mapping() {
        let outcome = RequestOutcome::Accepted {
            user_id: UserId::from("u1"),
        };
        assert_eq!(outcome.state(), RequestState::Accepted);
        assert_eq!(RequestOutcome::TimedOut.state(), RequestState::TimedOut);
    }

    #[test]
    fn test_request_ids_unique() {
        let a = Request::new(RequestAction::TakeSeat, UserId::from("u1"), String::new());
        let b = Request::new(RequestAction::TakeSeat, UserId::from("u1"), String::new());
        assert_ne!(a.request_id, b.request_id);
    }
}
