//! Seat/mic coordinator
//!
//! Authoritative seat-list mutations plus every room-signaling call site:
//! seat applications, seat invitations, and device open requests. All
//! seat-affecting work for a room happens under that room's single state
//! lock, including request resolution, so concurrent admin and user
//! actions can never observe a half-applied mutation.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::events::{ObserverHub, RoomObserver};
use crate::models::{
    ChangeReason, MediaDevice, MoveSeatPolicy, Request, RequestAction, RequestId, RoomId, SeatInfo,
    SeatLockParams, SeatMode, UserId, UserInfo,
};

use super::request::{RequestHandle, RequestTracker, TrackedRequest};
use super::room::vacate_seat_of;
use super::store::{RoomState, RoomStore};

/// Payload carried by every room-scoped signaling request
#[derive(Debug, Clone)]
pub struct RoomSignal {
    pub room_id: RoomId,
    pub request: Request,
    /// Requested seat index; `None` auto-picks at accept time
    pub seat_index: Option<usize>,
    pub device: Option<MediaDevice>,
}

pub type RoomRequestHandle = RequestHandle<RoomSignal>;

/// Seat service for seat-list state and room signaling
#[derive(Clone)]
pub struct SeatService {
    store: Arc<RoomStore>,
    observers: Arc<ObserverHub<dyn RoomObserver>>,
    tracker: RequestTracker<RoomSignal>,
}

impl std::fmt::Debug for SeatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatService").finish()
    }
}

impl SeatService {
    pub fn new(store: Arc<RoomStore>, observers: Arc<ObserverHub<dyn RoomObserver>>) -> Self {
        Self {
            store,
            observers,
            tracker: RequestTracker::new(),
        }
    }

    pub fn get_seat_list(&self, caller: &UserId, room_id: &RoomId) -> Result<Vec<SeatInfo>> {
        self.store.read_room(room_id, |state| {
            state.require_member(caller)?;
            Ok(state.seats.clone())
        })
    }

    /// Pending seat applications, visible to admins
    pub fn get_seat_application_list(
        &self,
        caller: &UserId,
        room_id: &RoomId,
    ) -> Result<Vec<Request>> {
        self.store.read_room(room_id, |state| {
            state.require_admin(caller)?;
            Ok(())
        })?;
        Ok(self
            .tracker
            .pending_matching(|t| {
                t.payload.room_id == *room_id
                    && t.payload.request.action == RequestAction::TakeSeat
            })
            .into_iter()
            .map(|t| t.payload.request)
            .collect())
    }

    /// Take a seat.
    ///
    /// In free-to-take mode (and always for admins) the seat is taken
    /// immediately and the returned handle is already accepted. In
    /// apply-to-take mode the request goes to the room's admins and the
    /// seat is taken when one of them agrees.
    pub fn take_seat(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        seat_index: Option<usize>,
        timeout: Duration,
    ) -> Result<RoomRequestHandle> {
        let room = self.store.get(room_id)?;
        let mut state = room.write();

        require_seats_enabled(&state)?;
        let member = state.require_member(caller)?.clone();
        if state.seat_index_of(caller).is_some() {
            return Err(Error::AlreadyInSeat);
        }
        let index = resolve_seat_index(&state, seat_index)?;

        let request_id = RequestId::new();
        let request = request_dto(request_id.clone(), RequestAction::TakeSeat, &member);

        if state.info.seat_mode == SeatMode::FreeToTake || member.role.is_admin() {
            let seated = seat_user(&mut state, index, &member)?;
            let members = state.member_ids();
            let seat_list = state.seats.clone();
            drop(state);

            self.notify_seat_list_changed(&members, &seat_list, &[seated], &[]);
            let tracked = TrackedRequest {
                request_id,
                issuer: caller.clone(),
                targets: vec![caller.clone()],
                payload: RoomSignal {
                    room_id: room_id.clone(),
                    request,
                    seat_index: Some(index),
                    device: None,
                },
                created_at: chrono::Utc::now(),
            };
            return Ok(self.tracker.resolved_handle(
                tracked,
                crate::models::RequestOutcome::Accepted {
                    user_id: caller.clone(),
                },
            ));
        }

        let admins = state.admins();
        let handle = self.tracker.issue_with_id(
            request_id,
            RoomSignal {
                room_id: room_id.clone(),
                request: request.clone(),
                seat_index,
                device: None,
            },
            caller.clone(),
            admins.clone(),
            timeout,
        )?;
        drop(state);

        self.observers.notify_users(admins.iter(), |observer| {
            observer.on_request_received(&request);
        });
        Ok(handle)
    }

    /// Invite a user onto a seat (admin only). The invited user accepts
    /// or rejects through [`respond_request`](Self::respond_request).
    pub fn take_user_on_seat_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        seat_index: Option<usize>,
        user_id: &UserId,
        timeout: Duration,
    ) -> Result<RoomRequestHandle> {
        let room = self.store.get(room_id)?;
        let state = room.write();

        require_seats_enabled(&state)?;
        let admin = state.require_admin(caller)?.clone();
        if state.member(user_id).is_none() {
            return Err(Error::UserNotExist(user_id.to_string()));
        }
        if state.seat_index_of(user_id).is_some() {
            return Err(Error::AlreadyInSeat);
        }
        resolve_seat_index(&state, seat_index)?;

        let request_id = RequestId::new();
        let request = request_dto(request_id.clone(), RequestAction::RemoteUserOnSeat, &admin);
        let handle = self.tracker.issue_with_id(
            request_id,
            RoomSignal {
                room_id: room_id.clone(),
                request: request.clone(),
                seat_index,
                device: None,
            },
            caller.clone(),
            vec![user_id.clone()],
            timeout,
        )?;
        drop(state);

        self.observers.notify_user(user_id, |observer| {
            observer.on_request_received(&request);
        });
        Ok(handle)
    }

    /// Leave the seat currently held
    pub fn leave_seat(&self, caller: &UserId, room_id: &RoomId) -> Result<()> {
        let (members, seat_list, left) = self.store.with_room(room_id, |state| {
            state.require_member(caller)?;
            let left = vacate_seat_of(state, caller).ok_or(Error::UserNotInSeat)?;
            Ok((state.member_ids(), state.seats.clone(), left))
        })?;

        self.notify_seat_list_changed(&members, &seat_list, &[], &left);
        Ok(())
    }

    /// Move to another seat; both slots change in one observable step
    pub fn move_to_seat(&self, caller: &UserId, room_id: &RoomId, target_index: usize) -> Result<()> {
        let (members, seat_list, seated, left) = self.store.with_room(room_id, |state| {
            let member = state.require_member(caller)?.clone();
            let current = state.seat_index_of(caller).ok_or(Error::UserNotInSeat)?;
            if current == target_index {
                return Err(Error::RepeatOperation);
            }
            let target = state.seat(target_index)?;
            if target.is_occupied() {
                return Err(Error::SeatOccupied);
            }
            if target.is_locked {
                return Err(Error::SeatLocked);
            }

            let before = state.seats[current].clone();
            state.seats[current].vacate();
            let seated = seat_user(state, target_index, &member)?;
            Ok((state.member_ids(), state.seats.clone(), seated, before))
        })?;

        self.notify_seat_list_changed(&members, &seat_list, &[seated], &[left]);
        Ok(())
    }

    /// Move a seated user to another seat (admin only).
    ///
    /// When the target seat is occupied the `policy` decides: abort,
    /// evict the occupant, or swap the two users. A swap updates both
    /// slots atomically and members observe exactly one seat-list event
    /// carrying both deltas.
    pub fn move_user_to_seat_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        target_index: usize,
        policy: MoveSeatPolicy,
    ) -> Result<()> {
        let (members, seat_list, seated, left, evicted) =
            self.store.with_room(room_id, |state| {
                let admin = state.require_admin(caller)?.clone();
                let source = state.seat_index_of(user_id).ok_or(Error::UserNotInSeat)?;
                if source == target_index {
                    return Err(Error::RepeatOperation);
                }
                state.seat(target_index)?;

                let target_occupied = state.seats[target_index].is_occupied();
                if !target_occupied {
                    // Plain move, policy irrelevant
                    let member = state.require_member(user_id)?.clone();
                    let before = state.seats[source].clone();
                    state.seats[source].vacate();
                    let seated = seat_user(state, target_index, &member)?;
                    return Ok((
                        state.member_ids(),
                        state.seats.clone(),
                        vec![seated],
                        vec![before],
                        None,
                    ));
                }

                match policy {
                    MoveSeatPolicy::AbortWhenOccupied => Err(Error::SeatOccupied),
                    MoveSeatPolicy::ForceReplace => {
                        let occupant = state.seats[target_index]
                            .user_id
                            .clone()
                            .ok_or(Error::SeatOccupied)?;
                        let member = state.require_member(user_id)?.clone();
                        let source_before = state.seats[source].clone();
                        let target_before = state.seats[target_index].clone();
                        state.seats[target_index].vacate();
                        state.seats[source].vacate();
                        let seated = seat_user(state, target_index, &member)?;
                        Ok((
                            state.member_ids(),
                            state.seats.clone(),
                            vec![seated],
                            vec![source_before, target_before],
                            Some((occupant, target_index, admin)),
                        ))
                    }
                    MoveSeatPolicy::SwapPosition => {
                        // Both slots update in one observable step
                        let moved = state.require_member(user_id)?.clone();
                        let occupant_id = state.seats[target_index]
                            .user_id
                            .clone()
                            .ok_or(Error::SeatOccupied)?;
                        let occupant = state.require_member(&occupant_id)?.clone();
                        state.seats[source].vacate();
                        state.seats[target_index].vacate();
                        let seated_a = seat_user(state, target_index, &moved)?;
                        let seated_b = seat_user(state, source, &occupant)?;
                        Ok((
                            state.member_ids(),
                            state.seats.clone(),
                            vec![seated_b, seated_a],
                            vec![],
                            None,
                        ))
                    }
                }
            })?;

        self.notify_seat_list_changed(&members, &seat_list, &seated, &left);
        if let Some((occupant, index, admin)) = evicted {
            self.observers.notify_user(&occupant, |observer| {
                observer.on_kicked_off_seat(index, &admin);
            });
        }
        Ok(())
    }

    /// Toggle the three lock bits of a seat (admin only); locking a seat
    /// does not touch its occupant
    pub fn lock_seat_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        seat_index: usize,
        params: SeatLockParams,
    ) -> Result<()> {
        let (members, seat_list) = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            let seat = state.seat_mut(seat_index)?;
            seat.is_locked = params.lock_seat;
            seat.is_video_locked = params.lock_video;
            seat.is_audio_locked = params.lock_audio;
            Ok((state.member_ids(), state.seats.clone()))
        })?;

        self.notify_seat_list_changed(&members, &seat_list, &[], &[]);
        Ok(())
    }

    /// Force a user off their seat (admin only)
    pub fn kick_user_off_seat_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        seat_index: usize,
        user_id: &UserId,
    ) -> Result<()> {
        let (members, seat_list, left, admin) = self.store.with_room(room_id, |state| {
            let admin = state.require_admin(caller)?.clone();
            let seat = state.seat(seat_index)?;
            if seat.user_id.as_ref() != Some(user_id) {
                return Err(Error::UserNotInSeat);
            }
            let before = state.seats[seat_index].clone();
            state.seats[seat_index].vacate();
            Ok((state.member_ids(), state.seats.clone(), before, admin))
        })?;

        self.notify_seat_list_changed(&members, &seat_list, &[], &[left]);
        self.observers.notify_user(user_id, |observer| {
            observer.on_kicked_off_seat(seat_index, &admin);
        });
        Ok(())
    }

    // --- Device signaling ---

    /// Ask a user to open their camera or microphone (admin only)
    pub fn open_remote_device_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        device: MediaDevice,
        timeout: Duration,
    ) -> Result<RoomRequestHandle> {
        let action = match device {
            MediaDevice::Camera => RequestAction::OpenRemoteCamera,
            MediaDevice::Microphone => RequestAction::OpenRemoteMicrophone,
            MediaDevice::ScreenSharing => {
                return Err(Error::InvalidParameter(
                    "screen sharing cannot be opened remotely".to_string(),
                ));
            }
        };

        let room = self.store.get(room_id)?;
        let state = room.write();
        let admin = state.require_admin(caller)?.clone();
        if state.member(user_id).is_none() {
            return Err(Error::UserNotExist(user_id.to_string()));
        }

        let request_id = RequestId::new();
        let request = request_dto(request_id.clone(), action, &admin);
        let handle = self.tracker.issue_with_id(
            request_id,
            RoomSignal {
                room_id: room_id.clone(),
                request: request.clone(),
                seat_index: None,
                device: Some(device),
            },
            caller.clone(),
            vec![user_id.clone()],
            timeout,
        )?;
        drop(state);

        self.observers.notify_user(user_id, |observer| {
            observer.on_request_received(&request);
        });
        Ok(handle)
    }

    /// Apply to the room's admins to open a local device
    pub fn apply_to_admin_to_open_local_device(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        device: MediaDevice,
        timeout: Duration,
    ) -> Result<RoomRequestHandle> {
        let action = match device {
            MediaDevice::Camera => RequestAction::ApplyToAdminToOpenLocalCamera,
            MediaDevice::Microphone => RequestAction::ApplyToAdminToOpenLocalMicrophone,
            MediaDevice::ScreenSharing => RequestAction::ApplyToAdminToOpenLocalScreenShare,
        };

        let room = self.store.get(room_id)?;
        let state = room.write();
        let member = state.require_member(caller)?.clone();
        let admins = state.admins();

        let request_id = RequestId::new();
        let request = request_dto(request_id.clone(), action, &member);
        let handle = self.tracker.issue_with_id(
            request_id,
            RoomSignal {
                room_id: room_id.clone(),
                request: request.clone(),
                seat_index: None,
                device: Some(device),
            },
            caller.clone(),
            admins.clone(),
            timeout,
        )?;
        drop(state);

        self.observers.notify_users(admins.iter(), |observer| {
            observer.on_request_received(&request);
        });
        Ok(handle)
    }

    // --- Request resolution ---

    /// Cancel a still-pending request as its issuer; targets observe
    /// `on_request_cancelled`.
    pub fn cancel_request(&self, caller: &UserId, request_id: &RequestId) -> Result<()> {
        let tracked = self.tracker.cancel(caller, request_id)?;
        let room_id = tracked.payload.room_id.clone();
        let operate_user = self
            .store
            .read_room(&room_id, |state| {
                Ok(state.member(caller).cloned())
            })
            .ok()
            .flatten()
            .unwrap_or_else(|| UserInfo::new(caller.clone(), tracked.payload.request.user_name.clone()));

        self.observers
            .notify_users(tracked.targets.iter(), |observer| {
                observer.on_request_cancelled(&tracked.payload.request, &operate_user);
            });
        Ok(())
    }

    /// Resolve a request as one of its targets.
    ///
    /// On agreement the request's effect (seating the applicant, seating
    /// the invitee, or flipping a device state) is validated and applied
    /// under the room lock together with the resolution; a conflicting
    /// seat state fails the call and leaves the request pending so the
    /// responder can reject instead.
    pub fn respond_request(&self, caller: &UserId, request_id: &RequestId, agree: bool) -> Result<()> {
        let Some(tracked) = self.tracker.get(request_id) else {
            // Terminal or unknown: the tracker reports the precise error
            self.tracker.respond(caller, request_id, agree, "")?;
            return Ok(());
        };
        if !tracked.targets.contains(caller) {
            return Err(Error::RequestNoPermission);
        }
        let room_id = tracked.payload.room_id.clone();

        let room = self.store.get(&room_id)?;
        let mut state = room.write();
        let responder = state.require_member(caller)?.clone();

        if !agree {
            let tracked = self.tracker.respond(caller, request_id, false, "")?;
            drop(state);
            self.notify_request_processed(&tracked, &responder);
            return Ok(());
        }

        // Validate the effect before resolving so a stale accept fails
        // the responder instead of losing the request
        let effect = plan_effect(&state, caller, &tracked)?;
        let tracked = self.tracker.respond(caller, request_id, true, "")?;
        let applied = apply_effect(&mut state, effect)?;
        let members = state.member_ids();
        let seat_list = state.seats.clone();
        drop(state);

        match applied {
            AppliedEffect::Seated(seat) => {
                self.notify_seat_list_changed(&members, &seat_list, &[seat], &[]);
            }
            AppliedEffect::StreamChanged {
                user_id,
                device,
                reason,
            } => {
                self.notify_stream_changed(&members, &user_id, device, reason);
            }
        }
        self.notify_request_processed(&tracked, &responder);
        Ok(())
    }

    fn notify_request_processed(
        &self,
        tracked: &TrackedRequest<RoomSignal>,
        responder: &UserInfo,
    ) {
        let other_targets: Vec<UserId> = tracked
            .targets
            .iter()
            .filter(|id| **id != responder.user_id)
            .cloned()
            .collect();
        self.observers
            .notify_users(other_targets.iter(), |observer| {
                observer.on_request_processed(&tracked.payload.request, responder);
            });
    }

    fn notify_seat_list_changed(
        &self,
        members: &[UserId],
        seat_list: &[SeatInfo],
        seated: &[SeatInfo],
        left: &[SeatInfo],
    ) {
        self.observers.notify_users(members.iter(), |observer| {
            observer.on_seat_list_changed(seat_list, seated, left);
        });
    }

    fn notify_stream_changed(
        &self,
        members: &[UserId],
        user_id: &UserId,
        device: MediaDevice,
        reason: ChangeReason,
    ) {
        self.observers.notify_users(members.iter(), |observer| match device {
            MediaDevice::Camera | MediaDevice::ScreenSharing => {
                observer.on_user_video_state_changed(user_id, true, reason);
            }
            MediaDevice::Microphone => {
                observer.on_user_audio_state_changed(user_id, true, reason);
            }
        });
    }
}

/// The accepted request's pending effect, computed before resolution
enum PlannedEffect {
    SeatUser { user_id: UserId, index: usize },
    OpenStream { user_id: UserId, device: MediaDevice },
}

enum AppliedEffect {
    Seated(SeatInfo),
    StreamChanged {
        user_id: UserId,
        device: MediaDevice,
        reason: ChangeReason,
    },
}

fn plan_effect(
    state: &RoomState,
    responder: &UserId,
    tracked: &TrackedRequest<RoomSignal>,
) -> Result<PlannedEffect> {
    let signal = &tracked.payload;
    match signal.request.action {
        RequestAction::TakeSeat => {
            let applicant = &tracked.issuer;
            if state.member(applicant).is_none() {
                return Err(Error::UserNotExist(applicant.to_string()));
            }
            if state.seat_index_of(applicant).is_some() {
                return Err(Error::AlreadyInSeat);
            }
            let index = resolve_seat_index(state, signal.seat_index)?;
            Ok(PlannedEffect::SeatUser {
                user_id: applicant.clone(),
                index,
            })
        }
        RequestAction::RemoteUserOnSeat => {
            // The invited user is the responder
            if state.seat_index_of(responder).is_some() {
                return Err(Error::AlreadyInSeat);
            }
            let index = resolve_seat_index(state, signal.seat_index)?;
            Ok(PlannedEffect::SeatUser {
                user_id: responder.clone(),
                index,
            })
        }
        RequestAction::OpenRemoteCamera | RequestAction::OpenRemoteMicrophone => {
            let device = signal.device.ok_or_else(|| {
                Error::InvalidParameter("device request without a device".to_string())
            })?;
            Ok(PlannedEffect::OpenStream {
                user_id: responder.clone(),
                device,
            })
        }
        RequestAction::ApplyToAdminToOpenLocalCamera
        | RequestAction::ApplyToAdminToOpenLocalMicrophone
        | RequestAction::ApplyToAdminToOpenLocalScreenShare => {
            let device = signal.device.ok_or_else(|| {
                Error::InvalidParameter("device request without a device".to_string())
            })?;
            let applicant = &tracked.issuer;
            if state.member(applicant).is_none() {
                return Err(Error::UserNotExist(applicant.to_string()));
            }
            Ok(PlannedEffect::OpenStream {
                user_id: applicant.clone(),
                device,
            })
        }
    }
}

fn apply_effect(state: &mut RoomState, effect: PlannedEffect) -> Result<AppliedEffect> {
    match effect {
        PlannedEffect::SeatUser { user_id, index } => {
            let member = state.require_member(&user_id)?.clone();
            let seat = seat_user(state, index, &member)?;
            Ok(AppliedEffect::Seated(seat))
        }
        PlannedEffect::OpenStream { user_id, device } => {
            let member = state.require_member_mut(&user_id)?;
            match device {
                MediaDevice::Camera => member.has_video_stream = true,
                MediaDevice::Microphone => member.has_audio_stream = true,
                MediaDevice::ScreenSharing => member.has_screen_stream = true,
            }
            Ok(AppliedEffect::StreamChanged {
                user_id,
                device,
                reason: ChangeReason::BySelf,
            })
        }
    }
}

fn require_seats_enabled(state: &RoomState) -> Result<()> {
    if !state.info.is_seat_enabled {
        return Err(Error::OperationNotSupportedInCurrentRoomType);
    }
    Ok(())
}

/// Validate an explicit index or auto-pick the lowest free seat
fn resolve_seat_index(state: &RoomState, requested: Option<usize>) -> Result<usize> {
    match requested {
        Some(index) => {
            let seat = state.seat(index)?;
            if seat.is_occupied() {
                return Err(Error::SeatOccupied);
            }
            if seat.is_locked {
                return Err(Error::SeatLocked);
            }
            Ok(index)
        }
        None => state.first_free_seat().ok_or(Error::AllSeatOccupied),
    }
}

fn seat_user(state: &mut RoomState, index: usize, member: &UserInfo) -> Result<SeatInfo> {
    let name_card = member.name_card.clone();
    let seat = state.seat_mut(index)?;
    if seat.is_occupied() {
        return Err(Error::SeatOccupied);
    }
    seat.occupy(
        member.user_id.clone(),
        member.user_name.clone(),
        member.avatar_url.clone(),
    );
    if !name_card.is_empty() {
        seat.name_card = Some(name_card);
    }
    Ok(seat.clone())
}

fn request_dto(request_id: RequestId, action: RequestAction, issuer: &UserInfo) -> Request {
    Request {
        request_id,
        action,
        user_id: issuer.user_id.clone(),
        user_name: issuer.user_name.clone(),
        name_card: issuer.name_card.clone(),
        avatar_url: issuer.avatar_url.clone(),
        content: String::new(),
        timestamp: chrono::Utc::now(),
    }
}
