pub mod battle;
pub mod connection;
pub mod id;
pub mod invitation;
pub mod message;
pub mod request;
pub mod room;
pub mod seat;
pub mod user;

pub use battle::{
    BattleCode, BattleConfig, BattleId, BattleInfo, BattleStoppedReason, BattleUser,
};
pub use connection::{ConnectionCode, ConnectionUser};
pub use id::{generate_id, RequestId, RoomId, UserId};
pub use invitation::{Invitation, InvitationCode, InvitationRejectedReason, InvitationStatus};
pub use message::{CustomMessage, TextMessage};
pub use request::{Request, RequestAction, RequestOutcome, RequestState};
pub use room::{
    DismissedReason, EnterRoomOptions, KickedOutReason, RoomInfo, RoomType, SeatMode,
};
pub use seat::{DeviceStatus, MediaDevice, MoveSeatPolicy, SeatInfo, SeatLockParams};
pub use user::{ChangeReason, LoginUserInfo, Role, UserInfo};
