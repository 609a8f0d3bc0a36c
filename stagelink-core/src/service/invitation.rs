//! Conference invitation manager
//!
//! The request tracker instantiated with an invitation payload: invite
//! users into a conference, let them accept or reject, and keep the
//! room's pending-invitation list in sync for every member.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::events::{InvitationObserver, ObserverHub};
use crate::models::{
    Invitation, InvitationCode, InvitationRejectedReason, InvitationStatus, RequestId,
    RequestOutcome, RoomId, RoomType, UserId, UserInfo,
};

use super::request::RequestTracker;
use super::session::SessionService;
use super::store::RoomStore;

/// Payload carried by every tracked invitation
#[derive(Debug, Clone)]
pub struct InvitationSignal {
    pub room_id: RoomId,
    pub invitation: Invitation,
    pub extension_info: String,
}

/// Invitation service for conference rooms
#[derive(Clone)]
pub struct InvitationService {
    store: Arc<RoomStore>,
    sessions: SessionService,
    observers: Arc<ObserverHub<dyn InvitationObserver>>,
    tracker: RequestTracker<InvitationSignal>,
    /// request id of the pending invitation per (room, invitee)
    pending: Arc<DashMap<(RoomId, UserId), RequestId>>,
}

impl std::fmt::Debug for InvitationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationService").finish()
    }
}

impl InvitationService {
    pub fn new(
        store: Arc<RoomStore>,
        sessions: SessionService,
        observers: Arc<ObserverHub<dyn InvitationObserver>>,
    ) -> Self {
        Self {
            store,
            sessions,
            observers,
            tracker: RequestTracker::new(),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Invite users into a conference room.
    ///
    /// Returns a per-user result code; only `Success` entries produce a
    /// tracked invitation.
    pub fn invite_users(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_ids: &[UserId],
        timeout: Duration,
        extension_info: &str,
    ) -> Result<HashMap<UserId, InvitationCode>> {
        if user_ids.is_empty() {
            return Err(Error::InvalidParameter(
                "invitee list cannot be empty".to_string(),
            ));
        }
        let (room_info, inviter) = self.store.read_room(room_id, |state| {
            if state.info.room_type != RoomType::Conference {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            let inviter = state.require_member(caller)?.clone();
            Ok((state.info.clone(), inviter))
        })?;

        let mut results = HashMap::new();
        for user_id in user_ids {
            let already_member = self
                .store
                .read_room(room_id, |state| Ok(state.member(user_id).is_some()))
                .unwrap_or(false);
            if already_member {
                results.insert(user_id.clone(), InvitationCode::AlreadyInConference);
                continue;
            }
            if self.pending.contains_key(&(room_id.clone(), user_id.clone())) {
                results.insert(user_id.clone(), InvitationCode::AlreadyInInvitationList);
                continue;
            }

            let invitee = self.invitee_profile(user_id);
            let mut invitation = Invitation::new(inviter.clone(), invitee);
            invitation.status = InvitationStatus::Pending;
            let signal = InvitationSignal {
                room_id: room_id.clone(),
                invitation: invitation.clone(),
                extension_info: extension_info.to_string(),
            };

            let service = self.clone();
            let room_for_hook = room_info.clone();
            let handle = self.tracker.issue_with_hook(
                signal,
                caller.clone(),
                vec![user_id.clone()],
                timeout,
                Box::new(move |tracked, outcome| {
                    if matches!(outcome, RequestOutcome::TimedOut) {
                        service.on_invitation_timed_out(&room_for_hook, tracked);
                    }
                }),
            )?;
            self.pending.insert(
                (room_id.clone(), user_id.clone()),
                handle.request_id().clone(),
            );

            self.observers.notify_user(user_id, |observer| {
                observer.on_receive_invitation(&room_info, &invitation, extension_info);
            });
            self.notify_room_members(room_id, |observer| {
                observer.on_invitation_added(room_id, &invitation);
            });
            results.insert(user_id.clone(), InvitationCode::Success);
        }
        Ok(results)
    }

    /// Cancel pending invitations as their inviter
    pub fn cancel_invitation(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> Result<()> {
        let room_info = self.store.read_room(room_id, |state| Ok(state.info.clone()))?;
        for user_id in user_ids {
            let Some((_, request_id)) = self.pending.remove(&(room_id.clone(), user_id.clone()))
            else {
                continue;
            };
            let tracked = self.tracker.cancel(caller, &request_id)?;
            let invitation = tracked.payload.invitation;

            self.observers.notify_user(user_id, |observer| {
                observer.on_invitation_cancelled(&room_info, &invitation);
            });
            self.notify_room_members(room_id, |observer| {
                observer.on_invitation_removed(room_id, &invitation);
            });
        }
        Ok(())
    }

    /// Revoke another member's invitation (admin only)
    pub fn revoke_invitation_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<()> {
        let (room_info, admin) = self.store.read_room(room_id, |state| {
            let admin = state.require_admin(caller)?.clone();
            Ok((state.info.clone(), admin))
        })?;
        let (_, request_id) = self
            .pending
            .remove(&(room_id.clone(), user_id.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        // Resolve on the inviter's behalf; the admin identity rides in
        // the revoked event
        let issuer = self
            .tracker
            .get(&request_id)
            .map(|tracked| tracked.issuer)
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.cancel(&issuer, &request_id)?;
        let invitation = tracked.payload.invitation;

        self.observers.notify_user(user_id, |observer| {
            observer.on_invitation_revoked_by_admin(&room_info, &invitation, &admin);
        });
        self.notify_room_members(room_id, |observer| {
            observer.on_invitation_removed(room_id, &invitation);
        });
        Ok(())
    }

    /// Accept the invitation to `room_id`
    pub fn accept(&self, caller: &UserId, room_id: &RoomId) -> Result<()> {
        let room_info = self.store.read_room(room_id, |state| Ok(state.info.clone()))?;
        let (_, request_id) = self
            .pending
            .remove(&(room_id.clone(), caller.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.respond(caller, &request_id, true, "")?;
        let mut invitation = tracked.payload.invitation;
        invitation.status = InvitationStatus::Accepted;

        self.observers
            .notify_user(&tracked.issuer, |observer| {
                observer.on_invitation_accepted(&room_info, &invitation);
            });
        self.notify_room_members(room_id, |observer| {
            observer.on_invitation_status_changed(room_id, &invitation);
        });
        Ok(())
    }

    /// Reject the invitation to `room_id`
    pub fn reject(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        reason: InvitationRejectedReason,
    ) -> Result<()> {
        let room_info = self.store.read_room(room_id, |state| Ok(state.info.clone()))?;
        let (_, request_id) = self
            .pending
            .remove(&(room_id.clone(), caller.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.respond(caller, &request_id, false, "")?;
        let mut invitation = tracked.payload.invitation;
        invitation.status = InvitationStatus::Rejected;

        self.observers
            .notify_user(&tracked.issuer, |observer| {
                observer.on_invitation_rejected(&room_info, &invitation, reason);
            });
        self.notify_room_members(room_id, |observer| {
            observer.on_invitation_status_changed(room_id, &invitation);
        });
        Ok(())
    }

    /// Pending invitations of a room, visible to members
    pub fn get_invitation_list(&self, caller: &UserId, room_id: &RoomId) -> Result<Vec<Invitation>> {
        self.store.read_room(room_id, |state| {
            state.require_member(caller)?;
            Ok(())
        })?;
        Ok(self
            .tracker
            .pending_matching(|tracked| tracked.payload.room_id == *room_id)
            .into_iter()
            .map(|tracked| tracked.payload.invitation)
            .collect())
    }

    fn on_invitation_timed_out(
        &self,
        room_info: &crate::models::RoomInfo,
        tracked: &super::request::TrackedRequest<InvitationSignal>,
    ) {
        let room_id = &tracked.payload.room_id;
        let invitee = &tracked.payload.invitation.invitee.user_id;
        self.pending.remove(&(room_id.clone(), invitee.clone()));

        let mut invitation = tracked.payload.invitation.clone();
        invitation.status = InvitationStatus::Timeout;
        self.observers.notify_user(invitee, |observer| {
            observer.on_invitation_timeout(room_info, &invitation);
        });
        self.observers
            .notify_user(&tracked.issuer, |observer| {
                observer.on_invitation_timeout(room_info, &invitation);
            });
        self.notify_room_members(room_id, |observer| {
            observer.on_invitation_removed(room_id, &invitation);
        });
    }

    fn notify_room_members(&self, room_id: &RoomId, deliver: impl Fn(&(dyn InvitationObserver + 'static))) {
        let members = self
            .store
            .read_room(room_id, |state| Ok(state.member_ids()))
            .unwrap_or_default();
        self.observers.notify_users(members.iter(), deliver);
    }

    fn invitee_profile(&self, user_id: &UserId) -> UserInfo {
        match self.sessions.get_self_info(user_id) {
            Ok(profile) => {
                let mut info = UserInfo::new(profile.user_id, profile.user_name);
                info.avatar_url = profile.avatar_url;
                info
            }
            Err(_) => UserInfo::new(user_id.clone(), user_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::events::DuplicatePolicy;
    use crate::models::{EnterRoomOptions, LoginUserInfo, RoomInfo};
    use crate::service::room::RoomService;
    use crate::service::session::AcceptAnySig;

    struct Fixture {
        invitations: InvitationService,
        room_id: RoomId,
        owner: UserId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(RoomStore::new());
        let sessions = SessionService::new(Arc::new(AcceptAnySig));
        let hub: Arc<ObserverHub<dyn InvitationObserver>> =
            Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let room_hub = Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let rooms = RoomService::new(store.clone(), room_hub, RoomConfig::default());
        let invitations = InvitationService::new(store, sessions.clone(), hub);

        let owner = LoginUserInfo {
            user_id: UserId::from("owner"),
            user_name: "owner".to_string(),
            avatar_url: String::new(),
        };
        sessions.login(1, owner.user_id.clone(), "sig").await.unwrap();
        sessions.login(1, UserId::from("guest"), "sig").await.unwrap();
        rooms
            .create_room(
                &owner,
                RoomInfo::new(RoomId::from("conf"), RoomType::Conference),
            )
            .unwrap();
        rooms
            .enter_room(
                &owner,
                &RoomId::from("conf"),
                RoomType::Conference,
                &EnterRoomOptions::default(),
            )
            .unwrap();

        Fixture {
            invitations,
            room_id: RoomId::from("conf"),
            owner: owner.user_id,
        }
    }

    #[tokio::test]
    async fn test_invite_accept_roundtrip() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        let results = fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        assert_eq!(results.get(&guest), Some(&InvitationCode::Success));
        assert_eq!(
            fixture
                .invitations
                .get_invitation_list(&fixture.owner, &fixture.room_id)
                .unwrap()
                .len(),
            1
        );

        fixture.invitations.accept(&guest, &fixture.room_id).unwrap();
        assert!(fixture
            .invitations
            .get_invitation_list(&fixture.owner, &fixture.room_id)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_invite_reports_code() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        let results = fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone(), fixture.owner.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();

        assert_eq!(
            results.get(&guest),
            Some(&InvitationCode::AlreadyInInvitationList)
        );
        assert_eq!(
            results.get(&fixture.owner),
            Some(&InvitationCode::AlreadyInConference)
        );
    }

    #[tokio::test]
    async fn test_reject_clears_pending() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        fixture
            .invitations
            .reject(
                &guest,
                &fixture.room_id,
                InvitationRejectedReason::InOtherConference,
            )
            .unwrap();

        // A new invitation may be issued afterwards
        let results = fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        assert_eq!(results.get(&guest), Some(&InvitationCode::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invitation_timeout_clears_pending() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(30),
                "",
            )
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        // Let the timeout supervisor run
        tokio::task::yield_now().await;

        assert!(fixture
            .invitations
            .get_invitation_list(&fixture.owner, &fixture.room_id)
            .unwrap()
            .is_empty());
        assert_eq!(
            fixture
                .invitations
                .accept(&guest, &fixture.room_id)
                .unwrap_err(),
            Error::RequestIdInvalid
        );
    }

    #[tokio::test]
    async fn test_admin_revokes_invitation() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        fixture
            .invitations
            .revoke_invitation_by_admin(&fixture.owner, &fixture.room_id, &guest)
            .unwrap();

        assert!(fixture
            .invitations
            .get_invitation_list(&fixture.owner, &fixture.room_id)
            .unwrap()
            .is_empty());
        assert_eq!(
            fixture
                .invitations
                .revoke_invitation_by_admin(&fixture.owner, &fixture.room_id, &guest)
                .unwrap_err(),
            Error::RequestIdInvalid
        );
    }

    #[tokio::test]
    async fn test_cancel_invitation() {
        let fixture = fixture().await;
        let guest = UserId::from("guest");

        fixture
            .invitations
            .invite_users(
                &fixture.owner,
                &fixture.room_id,
                &[guest.clone()],
                Duration::from_secs(60),
                "",
            )
            .unwrap();
        fixture
            .invitations
            .cancel_invitation(&fixture.owner, &fixture.room_id, &[guest.clone()])
            .unwrap();

        assert_eq!(
            fixture
                .invitations
                .accept(&guest, &fixture.room_id)
                .unwrap_err(),
            Error::RequestIdInvalid
        );
    }
}
