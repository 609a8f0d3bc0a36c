//! Commonly used types, for glob import

pub use crate::engine::{RoomEngine, RoomEngineBuilder};
pub use crate::media::{AudioQuality, MediaEngine, NullMedia, VideoQuality, VideoStreamType};

pub use stagelink_core::config::Config;
pub use stagelink_core::error::{Error, Result};
pub use stagelink_core::events::{
    BattleObserver, ConnectionObserver, DuplicatePolicy, InvitationObserver, RoomObserver,
};
pub use stagelink_core::models::{
    BattleCode, BattleConfig, BattleId, BattleInfo, BattleStoppedReason, BattleUser, ChangeReason,
    ConnectionCode, ConnectionUser, CustomMessage, DismissedReason, EnterRoomOptions, Invitation,
    InvitationCode, InvitationRejectedReason, InvitationStatus, KickedOutReason, LoginUserInfo,
    MediaDevice, MoveSeatPolicy, Request, RequestAction, RequestId, RequestOutcome, RequestState,
    Role, RoomId, RoomInfo, RoomType, SeatInfo, SeatLockParams, SeatMode, TextMessage, UserId,
    UserInfo,
};
pub use stagelink_core::service::{
    AcceptAnySig, Authenticator, RoomRequestHandle, Services, SessionService,
};
