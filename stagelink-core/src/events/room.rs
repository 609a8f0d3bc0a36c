//! Room event surface

use crate::models::{
    ChangeReason, CustomMessage, DismissedReason, KickedOutReason, Request, RoomId, SeatInfo,
    SeatMode, TextMessage, UserId, UserInfo,
};

/// Observer for room, seat, signaling, and message events.
///
/// Every handler has a no-op default; implement only the events you care
/// about. Handlers are called synchronously on the mutating thread and
/// must not block.
#[allow(unused_variables)]
pub trait RoomObserver: Send + Sync {
    // --- Room events ---

    fn on_room_name_changed(&self, room_id: &RoomId, room_name: &str) {}

    fn on_room_seat_mode_changed(&self, room_id: &RoomId, seat_mode: SeatMode) {}

    fn on_room_user_count_changed(&self, room_id: &RoomId, user_count: usize) {}

    fn on_room_metadata_changed(&self, key: &str, value: &str) {}

    fn on_all_user_camera_disable_changed(&self, room_id: &RoomId, is_disable: bool) {}

    fn on_all_user_microphone_disable_changed(&self, room_id: &RoomId, is_disable: bool) {}

    fn on_screen_share_for_all_user_disable_changed(&self, room_id: &RoomId, is_disable: bool) {}

    fn on_send_message_for_all_user_disable_changed(&self, room_id: &RoomId, is_disable: bool) {}

    /// The room was dismissed; every member is forced out
    fn on_room_dismissed(&self, room_id: &RoomId, reason: DismissedReason) {}

    fn on_kicked_out_of_room(&self, room_id: &RoomId, reason: KickedOutReason, message: &str) {}

    // --- User events ---

    fn on_remote_user_enter_room(&self, room_id: &RoomId, user_info: &UserInfo) {}

    fn on_remote_user_leave_room(&self, room_id: &RoomId, user_info: &UserInfo) {}

    /// Role or name card changed
    fn on_user_info_changed(&self, user_info: &UserInfo) {}

    fn on_user_video_state_changed(&self, user_id: &UserId, has_video: bool, reason: ChangeReason) {
    }

    fn on_user_audio_state_changed(&self, user_id: &UserId, has_audio: bool, reason: ChangeReason) {
    }

    fn on_send_message_for_user_disable_changed(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        is_disable: bool,
    ) {
    }

    // --- Seat events ---

    /// The seat list changed. `seated` and `left` carry exactly the
    /// indices affected by the triggering call and are mutually exclusive.
    fn on_seat_list_changed(&self, seat_list: &[SeatInfo], seated: &[SeatInfo], left: &[SeatInfo]) {
    }

    fn on_kicked_off_seat(&self, seat_index: usize, operate_user: &UserInfo) {}

    // --- Signaling events ---

    /// A request targeting this side arrived
    fn on_request_received(&self, request: &Request) {}

    /// A pending request was cancelled by its issuer
    fn on_request_cancelled(&self, request: &Request, operate_user: &UserInfo) {}

    /// A request was resolved by another admin before this side responded
    fn on_request_processed(&self, request: &Request, operate_user: &UserInfo) {}

    // --- Message events ---

    fn on_receive_text_message(&self, message: &TextMessage) {}

    fn on_receive_custom_message(&self, message: &CustomMessage) {}
}
