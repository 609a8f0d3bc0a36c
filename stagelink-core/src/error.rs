use thiserror::Error;

/// Engine error taxonomy.
///
/// Every variant maps to a flat integer code (see [`Error::code`]) so the
/// error surface stays a `(code, message)` pair for embedders that bridge
/// it across an FFI or wire boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Request rate limited, retry later")]
    FreqLimit,

    #[error("Repeated operation")]
    RepeatOperation,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not logged in, call login first")]
    SdkNotInitialized,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid or expired license")]
    InvalidLicense,

    #[error("Operation requires entering a room first")]
    OperationInvalidBeforeEnterRoom,

    #[error("Room owner cannot exit, transfer ownership or destroy the room")]
    ExitNotSupportedForRoomOwner,

    #[error("Operation not supported in the current room type")]
    OperationNotSupportedInCurrentRoomType,

    #[error("Invalid room id: {0}")]
    RoomIdInvalid(String),

    #[error("Invalid room name: {0}")]
    RoomNameInvalid(String),

    #[error("Already in another room")]
    AlreadyInOtherRoom,

    #[error("User not found: {0}")]
    UserNotExist(String),

    #[error("Operation requires room owner permission")]
    UserNeedOwnerPermission,

    #[error("Operation requires room owner or administrator permission")]
    UserNeedAdminPermission,

    #[error("No permission on this request")]
    RequestNoPermission,

    #[error("Request id unknown or already processed")]
    RequestIdInvalid,

    #[error("Duplicate response for this request id")]
    RequestIdRepeat,

    #[error("Seat count exceeds the allowed maximum")]
    MaxSeatCountLimit,

    #[error("Seat index does not exist")]
    SeatIndexNotExist,

    #[error("Sending messages is disabled for all users in this room")]
    SendMessageDisabledForAll,

    #[error("You are muted in this room")]
    SendMessageDisabledForCurrent,

    #[error("Server internal error")]
    ServerSystemError,

    #[error("Room id already in use")]
    RoomIdOccupied,

    #[error("Room does not exist or was dismissed")]
    RoomIdNotExist,

    #[error("User is not in the room")]
    UserNotEntered,

    #[error("Room member capacity reached")]
    RoomUserFull,

    #[error("Room requires a password")]
    NeedPassword,

    #[error("Wrong room password")]
    WrongPassword,

    #[error("Seat is locked")]
    SeatLocked,

    #[error("Seat already occupied")]
    SeatOccupied,

    #[error("Already on a seat")]
    AlreadyInSeat,

    #[error("All seats are occupied")]
    AllSeatOccupied,

    #[error("User is not on a seat")]
    UserNotInSeat,

    #[error("Room is already connected")]
    RoomAlreadyConnected,

    #[error("Room is connecting with another room")]
    ConnectingOtherRoom,

    #[error("Connected room count limit reached")]
    MaxConnectedCountLimit,

    #[error("Room metadata key count exceeds the limit")]
    MetadataExceedKeyCountLimit,

    #[error("Room metadata value size exceeds the limit")]
    MetadataExceedValueSizeLimit,
}

impl Error {
    /// Flat integer code for this error, stable across releases.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::FreqLimit => -2,
            Self::RepeatOperation => -3,
            Self::InvalidParameter(_) => -1001,
            Self::SdkNotInitialized => -1002,
            Self::PermissionDenied(_) => -1003,
            Self::InvalidLicense => -1005,
            Self::OperationInvalidBeforeEnterRoom => -2101,
            Self::ExitNotSupportedForRoomOwner => -2102,
            Self::OperationNotSupportedInCurrentRoomType => -2103,
            Self::RoomIdInvalid(_) => -2105,
            Self::RoomNameInvalid(_) => -2107,
            Self::AlreadyInOtherRoom => -2108,
            Self::UserNotExist(_) => -2200,
            Self::UserNeedOwnerPermission => -2300,
            Self::UserNeedAdminPermission => -2301,
            Self::RequestNoPermission => -2310,
            Self::RequestIdInvalid => -2311,
            Self::RequestIdRepeat => -2312,
            Self::MaxSeatCountLimit => -2340,
            Self::SeatIndexNotExist => -2344,
            Self::SendMessageDisabledForAll => -2380,
            Self::SendMessageDisabledForCurrent => -2381,
            Self::ServerSystemError => 100_001,
            Self::RoomIdOccupied => 100_003,
            Self::RoomIdNotExist => 100_004,
            Self::UserNotEntered => 100_005,
            Self::RoomUserFull => 100_008,
            Self::NeedPassword => 100_018,
            Self::WrongPassword => 100_019,
            Self::SeatLocked => 100_200,
            Self::AlreadyInSeat => 100_203,
            Self::AllSeatOccupied => 100_205,
            Self::UserNotInSeat => 100_206,
            Self::SeatOccupied => 100_210,
            Self::RoomAlreadyConnected => 100_401,
            Self::ConnectingOtherRoom => 100_403,
            Self::MaxConnectedCountLimit => 100_404,
            Self::MetadataExceedKeyCountLimit => 100_500,
            Self::MetadataExceedValueSizeLimit => 100_501,
        }
    }

    /// Whether this error latches the session (every later operation on
    /// the same session short-circuits with it until re-login).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidLicense | Self::SdkNotInitialized)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
