//! Conference invitation event surface

use crate::models::{Invitation, InvitationRejectedReason, RoomId, RoomInfo, UserInfo};

/// Observer for conference invitation events.
///
/// Every handler has a no-op default.
#[allow(unused_variables)]
pub trait InvitationObserver: Send + Sync {
    /// This user was invited to a conference
    fn on_receive_invitation(
        &self,
        room_info: &RoomInfo,
        invitation: &Invitation,
        extension_info: &str,
    ) {
    }

    fn on_invitation_cancelled(&self, room_info: &RoomInfo, invitation: &Invitation) {}

    fn on_invitation_accepted(&self, room_info: &RoomInfo, invitation: &Invitation) {}

    fn on_invitation_rejected(
        &self,
        room_info: &RoomInfo,
        invitation: &Invitation,
        reason: InvitationRejectedReason,
    ) {
    }

    fn on_invitation_timeout(&self, room_info: &RoomInfo, invitation: &Invitation) {}

    fn on_invitation_revoked_by_admin(
        &self,
        room_info: &RoomInfo,
        invitation: &Invitation,
        admin: &UserInfo,
    ) {
    }

    // --- Invitation list bookkeeping, fanned out to room members ---

    fn on_invitation_added(&self, room_id: &RoomId, invitation: &Invitation) {}

    fn on_invitation_removed(&self, room_id: &RoomId, invitation: &Invitation) {}

    fn on_invitation_status_changed(&self, room_id: &RoomId, invitation: &Invitation) {}
}
