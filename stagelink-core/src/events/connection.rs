//! Cross-room connection event surface

use crate::models::ConnectionUser;

/// Observer for live-room connection events.
///
/// Every handler has a no-op default.
#[allow(unused_variables)]
pub trait ConnectionObserver: Send + Sync {
    /// The set of connected rooms changed
    fn on_connection_user_list_changed(
        &self,
        connected_list: &[ConnectionUser],
        joined_list: &[ConnectionUser],
        leaved_list: &[ConnectionUser],
    ) {
    }

    fn on_connection_request_received(
        &self,
        inviter: &ConnectionUser,
        invitee_list: &[ConnectionUser],
        extension_info: &str,
    ) {
    }

    fn on_connection_request_cancelled(&self, inviter: &ConnectionUser) {}

    fn on_connection_request_accept(&self, invitee: &ConnectionUser) {}

    fn on_connection_request_reject(&self, invitee: &ConnectionUser) {}

    fn on_connection_request_timeout(&self, inviter: &ConnectionUser, invitee: &ConnectionUser) {}
}
