//! Room lifecycle controller
//!
//! Orchestrates room creation/entry/exit/destruction and the admin-gated
//! configuration surface, and fans the matching events out to room
//! members. Seat mutations live in the seat service; both share the same
//! [`RoomStore`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RoomConfig;
use crate::error::{Error, Result};
use crate::events::{ObserverHub, RoomObserver};
use crate::models::{
    ChangeReason, CustomMessage, DismissedReason, EnterRoomOptions, KickedOutReason, LoginUserInfo,
    MediaDevice, Role, RoomId, RoomInfo, RoomType, SeatInfo, TextMessage, UserId, UserInfo,
};
use crate::validation;

use super::store::{RoomState, RoomStore};

/// Room service for lifecycle and configuration
#[derive(Clone)]
pub struct RoomService {
    store: Arc<RoomStore>,
    observers: Arc<ObserverHub<dyn RoomObserver>>,
    config: RoomConfig,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService").finish()
    }
}

impl RoomService {
    pub fn new(
        store: Arc<RoomStore>,
        observers: Arc<ObserverHub<dyn RoomObserver>>,
        config: RoomConfig,
    ) -> Self {
        Self {
            store,
            observers,
            config,
        }
    }

    /// Create a new room. The creator becomes the owner but does not
    /// enter the room; call [`enter_room`](Self::enter_room) next.
    pub fn create_room(&self, creator: &LoginUserInfo, mut info: RoomInfo) -> Result<RoomInfo> {
        validation::validate_room_id(info.room_id.as_str())?;
        if info.name.is_empty() {
            info.name = info.room_id.as_str().to_string();
        }
        validation::validate_room_name(&info.name)?;
        validation::validate_room_password(&info.password)?;

        if info.is_seat_enabled {
            if info.max_seat_count == 0 {
                info.max_seat_count = self.config.default_seat_count;
            }
            if info.max_seat_count > self.config.max_seat_count {
                return Err(Error::MaxSeatCountLimit);
            }
        } else {
            info.max_seat_count = 0;
        }

        info.owner_id = creator.user_id.clone();
        info.owner_name = creator.user_name.clone();
        info.owner_avatar_url = creator.avatar_url.clone();
        info.create_time = chrono::Utc::now();
        info.member_count = 0;

        self.store.insert(RoomState::new(info.clone()))?;
        tracing::info!(room_id = %info.room_id, room_type = %info.room_type, "room created");
        Ok(info)
    }

    /// Enter a room.
    ///
    /// When the caller already sits at the per-device joined-room limit
    /// for this room type, the oldest joined room of that type is left
    /// automatically instead of erroring.
    pub fn enter_room(
        &self,
        profile: &LoginUserInfo,
        room_id: &RoomId,
        room_type: RoomType,
        options: &EnterRoomOptions,
    ) -> Result<RoomInfo> {
        let (info, others) = self.store.with_room(room_id, |state| {
            if state.info.room_type != room_type {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            if state.member(&profile.user_id).is_some() {
                return Err(Error::RepeatOperation);
            }
            if state.info.has_password() && profile.user_id != state.info.owner_id {
                if options.password.is_empty() {
                    return Err(Error::NeedPassword);
                }
                if options.password != state.info.password {
                    return Err(Error::WrongPassword);
                }
            }
            if self.config.max_member_count > 0
                && state.members.len() >= self.config.max_member_count
            {
                return Err(Error::RoomUserFull);
            }

            let mut user = UserInfo::new(profile.user_id.clone(), profile.user_name.clone());
            user.avatar_url = profile.avatar_url.clone();
            if profile.user_id == state.info.owner_id {
                user.role = Role::Owner;
            }
            let entered = user.clone();
            state.add_member(user);

            Ok((state.info.clone(), (entered, state.member_ids())))
        })?;
        let (entered, member_ids) = others;

        self.store.record_join(&profile.user_id, room_id.clone());

        // Joining past the per-device limit leaves the oldest room of
        // this type instead of erroring
        if let Some(victim) = self.store.eviction_candidate(&profile.user_id, room_type) {
            tracing::info!(
                user_id = %profile.user_id,
                room_id = %victim,
                "joined room limit exceeded, leaving oldest room"
            );
            let _ = self.force_leave(
                &victim,
                &profile.user_id,
                KickedOutReason::JoinedRoomCountExceedLimit,
                "joined room count exceeded the per-device limit",
            );
        }

        let others: Vec<UserId> = member_ids
            .iter()
            .filter(|id| **id != profile.user_id)
            .cloned()
            .collect();
        self.observers
            .notify_users(others.iter(), |observer| {
                observer.on_remote_user_enter_room(room_id, &entered);
            });
        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_room_user_count_changed(room_id, member_ids.len());
        });

        tracing::debug!(room_id = %room_id, user_id = %profile.user_id, "user entered room");
        Ok(info)
    }

    /// Leave a room. The owner cannot leave; they transfer ownership
    /// first or destroy the room.
    pub fn exit_room(&self, caller: &UserId, room_id: &RoomId) -> Result<()> {
        let (left, vacated, remaining) = self.store.with_room(room_id, |state| {
            let member = state.require_member(caller)?;
            if member.role == Role::Owner {
                return Err(Error::ExitNotSupportedForRoomOwner);
            }
            let left = state
                .remove_member(caller)
                .ok_or(Error::UserNotEntered)?;
            let vacated = vacate_seat_of(state, caller);
            Ok((left, vacated, state.member_ids()))
        })?;

        self.store.record_leave(caller, room_id);
        self.notify_member_left(room_id, &left, vacated.as_ref(), &remaining);
        tracing::debug!(room_id = %room_id, user_id = %caller, "user exited room");
        Ok(())
    }

    /// Destroy a room (owner only). Every member observes
    /// `on_room_dismissed` and the room ceases to exist.
    pub fn destroy_room(&self, caller: &UserId, room_id: &RoomId) -> Result<()> {
        let members = {
            let room = self.store.get(room_id)?;
            let state = room.read();
            state.require_owner(caller)?;
            state.member_ids()
        };

        self.store.remove(room_id)?;
        for member in &members {
            self.store.record_leave(member, room_id);
        }
        self.observers.notify_users(members.iter(), |observer| {
            observer.on_room_dismissed(room_id, DismissedReason::ByOwner);
        });
        tracing::info!(room_id = %room_id, "room destroyed by owner");
        Ok(())
    }

    /// Dismiss a room on the server's behalf (license revoked, abuse,
    /// operational teardown)
    pub fn dismiss_room_by_server(&self, room_id: &RoomId) -> Result<()> {
        let members = {
            let room = self.store.get(room_id)?;
            let ids = room.read().member_ids();
            ids
        };
        self.store.remove(room_id)?;
        for member in &members {
            self.store.record_leave(member, room_id);
        }
        self.observers.notify_users(members.iter(), |observer| {
            observer.on_room_dismissed(room_id, DismissedReason::ByServer);
        });
        tracing::info!(room_id = %room_id, "room dismissed by server");
        Ok(())
    }

    pub fn fetch_room_info(&self, room_id: &RoomId) -> Result<RoomInfo> {
        self.store.read_room(room_id, |state| Ok(state.info.clone()))
    }

    /// Rooms a user is currently in, join order
    pub fn joined_rooms(&self, user_id: &UserId) -> Vec<RoomId> {
        self.store.joined_rooms(user_id)
    }

    /// Members in join order
    pub fn get_user_list(&self, caller: &UserId, room_id: &RoomId) -> Result<Vec<UserInfo>> {
        self.store.read_room(room_id, |state| {
            state.require_member(caller)?;
            Ok(state
                .member_order
                .iter()
                .filter_map(|id| state.members.get(id))
                .cloned()
                .collect())
        })
    }

    pub fn get_user_info(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<UserInfo> {
        self.store.read_room(room_id, |state| {
            state.require_member(caller)?;
            state
                .member(user_id)
                .cloned()
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))
        })
    }

    /// Change a member's role (owner only).
    ///
    /// Granting `Role::Owner` transfers ownership: the previous owner
    /// becomes a general user.
    pub fn change_user_role(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        role: Role,
    ) -> Result<()> {
        let (changed, member_ids) = self.store.with_room(room_id, |state| {
            state.require_owner(caller)?;
            if state.member(user_id).is_none() {
                return Err(Error::UserNotExist(user_id.to_string()));
            }
            if caller == user_id {
                return Err(Error::InvalidParameter(
                    "cannot change your own role".to_string(),
                ));
            }

            let mut changed = Vec::new();
            if role == Role::Owner {
                // Ownership transfer: demote the current owner first
                let old_owner = state.require_member_mut(caller)?;
                old_owner.role = Role::GeneralUser;
                changed.push(old_owner.clone());

                let new_owner = state.require_member_mut(user_id)?;
                new_owner.role = Role::Owner;
                let new_owner = new_owner.clone();
                state.info.owner_id = new_owner.user_id.clone();
                state.info.owner_name = new_owner.user_name.clone();
                state.info.owner_avatar_url = new_owner.avatar_url.clone();
                changed.push(new_owner);
            } else {
                let member = state.require_member_mut(user_id)?;
                member.role = role;
                changed.push(member.clone());
            }
            Ok((changed, state.member_ids()))
        })?;

        for user in &changed {
            self.observers.notify_users(member_ids.iter(), |observer| {
                observer.on_user_info_changed(user);
            });
        }
        Ok(())
    }

    /// Change a member's per-room display name; self-service, or any
    /// admin for other members.
    pub fn change_user_name_card(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        name_card: &str,
    ) -> Result<()> {
        validation::validate_name_card(name_card)?;
        let (changed, member_ids) = self.store.with_room(room_id, |state| {
            if caller != user_id {
                state.require_admin(caller)?;
            }
            let member = state
                .members
                .get_mut(user_id)
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))?;
            member.name_card = name_card.to_string();
            let changed = member.clone();

            // Seat records mirror the display name
            if let Some(index) = state.seat_index_of(user_id) {
                if let Ok(seat) = state.seat_mut(index) {
                    seat.name_card = Some(name_card.to_string());
                }
            }
            Ok((changed, state.member_ids()))
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_user_info_changed(&changed);
        });
        Ok(())
    }

    /// Remove a user from the room (admin only). Administrators cannot
    /// kick the owner or each other.
    pub fn kick_remote_user_out_of_room(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<()> {
        let (left, vacated, remaining) = self.store.with_room(room_id, |state| {
            let caller_role = state.require_admin(caller)?.role;
            if caller == user_id {
                return Err(Error::InvalidParameter(
                    "cannot kick yourself".to_string(),
                ));
            }
            let target = state
                .member(user_id)
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))?;
            if target.role == Role::Owner {
                return Err(Error::PermissionDenied(
                    "cannot kick the room owner".to_string(),
                ));
            }
            if target.role == Role::Administrator && caller_role != Role::Owner {
                return Err(Error::UserNeedOwnerPermission);
            }

            let left = state
                .remove_member(user_id)
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))?;
            let vacated = vacate_seat_of(state, user_id);
            Ok((left, vacated, state.member_ids()))
        })?;

        self.store.record_leave(user_id, room_id);
        self.observers.notify_user(user_id, |observer| {
            observer.on_kicked_out_of_room(room_id, KickedOutReason::ByAdmin, "kicked by admin");
        });
        self.notify_member_left(room_id, &left, vacated.as_ref(), &remaining);
        Ok(())
    }

    // --- Admin-gated configuration ---

    pub fn update_room_name_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        room_name: &str,
    ) -> Result<()> {
        validation::validate_room_name(room_name)?;
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            state.info.name = room_name.to_string();
            Ok(state.member_ids())
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_room_name_changed(room_id, room_name);
        });
        Ok(())
    }

    pub fn update_room_seat_mode_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        seat_mode: crate::models::SeatMode,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            if !state.info.is_seat_enabled {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            state.info.seat_mode = seat_mode;
            Ok(state.member_ids())
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_room_seat_mode_changed(room_id, seat_mode);
        });
        Ok(())
    }

    /// Update the room password (conference rooms only). Does not affect
    /// members already inside.
    pub fn update_room_password_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        password: &str,
    ) -> Result<()> {
        validation::validate_room_password(password)?;
        self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            if state.info.room_type != RoomType::Conference {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            state.info.password = password.to_string();
            Ok(())
        })
    }

    /// Fetch room metadata (live rooms only). An empty key list fetches
    /// everything.
    pub fn get_room_metadata(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        keys: &[String],
    ) -> Result<HashMap<String, String>> {
        self.store.read_room(room_id, |state| {
            state.require_member(caller)?;
            if state.info.room_type != RoomType::Live {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            if keys.is_empty() {
                return Ok(state.metadata.clone());
            }
            Ok(keys
                .iter()
                .filter_map(|key| {
                    state
                        .metadata
                        .get(key)
                        .map(|value| (key.clone(), value.clone()))
                })
                .collect())
        })
    }

    /// Merge metadata entries (live rooms only, admin only). Existing
    /// keys are overwritten; members observe one event per key.
    pub fn set_room_metadata_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in &metadata {
            validation::validate_metadata_entry(key, value)?;
        }
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            if state.info.room_type != RoomType::Live {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            let new_keys = metadata
                .keys()
                .filter(|key| !state.metadata.contains_key(*key))
                .count();
            if state.metadata.len() + new_keys > validation::METADATA_KEY_COUNT_MAX {
                return Err(Error::MetadataExceedKeyCountLimit);
            }
            state.metadata.extend(metadata.clone());
            Ok(state.member_ids())
        })?;

        for (key, value) in &metadata {
            self.observers.notify_users(member_ids.iter(), |observer| {
                observer.on_room_metadata_changed(key, value);
            });
        }
        Ok(())
    }

    /// Toggle a device class for every non-admin member (admin only)
    pub fn disable_device_for_all_user_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        device: MediaDevice,
        is_disable: bool,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            match device {
                MediaDevice::Camera => state.info.is_camera_disable_for_all_user = is_disable,
                MediaDevice::Microphone => {
                    state.info.is_microphone_disable_for_all_user = is_disable;
                }
                MediaDevice::ScreenSharing => {
                    state.info.is_screen_share_disable_for_all_user = is_disable;
                }
            }
            Ok(state.member_ids())
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| match device {
            MediaDevice::Camera => observer.on_all_user_camera_disable_changed(room_id, is_disable),
            MediaDevice::Microphone => {
                observer.on_all_user_microphone_disable_changed(room_id, is_disable);
            }
            MediaDevice::ScreenSharing => {
                observer.on_screen_share_for_all_user_disable_changed(room_id, is_disable);
            }
        });
        Ok(())
    }

    /// Mute or unmute one member (admin only)
    pub fn disable_sending_message_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        is_disable: bool,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            let member = state
                .members
                .get_mut(user_id)
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))?;
            member.is_message_disabled = is_disable;
            Ok(state.member_ids())
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_send_message_for_user_disable_changed(room_id, user_id, is_disable);
        });
        Ok(())
    }

    /// Mute or unmute every non-admin member (admin only)
    pub fn disable_sending_message_for_all_user(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        is_disable: bool,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            state.info.is_message_disable_for_all_user = is_disable;
            Ok(state.member_ids())
        })?;

        self.observers.notify_users(member_ids.iter(), |observer| {
            observer.on_send_message_for_all_user_disable_changed(room_id, is_disable);
        });
        Ok(())
    }

    // --- Device state ---

    /// Record that the caller opened or closed a local device and fan the
    /// state change out to the room.
    ///
    /// Opening honors the room-wide disable flags (admins are exempt) and
    /// the audio/video lock bits of the caller's seat.
    pub fn set_local_device_state(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        device: MediaDevice,
        enabled: bool,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            let member = state.require_member(caller)?.clone();
            if enabled && !member.role.is_admin() {
                let disabled_for_all = match device {
                    MediaDevice::Camera => state.info.is_camera_disable_for_all_user,
                    MediaDevice::Microphone => state.info.is_microphone_disable_for_all_user,
                    MediaDevice::ScreenSharing => state.info.is_screen_share_disable_for_all_user,
                };
                if disabled_for_all {
                    return Err(Error::PermissionDenied(format!(
                        "{device:?} is disabled for all users"
                    )));
                }
                if let Some(index) = state.seat_index_of(caller) {
                    let seat = state.seat(index)?;
                    let locked = match device {
                        MediaDevice::Camera => seat.is_video_locked,
                        MediaDevice::Microphone => seat.is_audio_locked,
                        MediaDevice::ScreenSharing => false,
                    };
                    if locked {
                        return Err(Error::SeatLocked);
                    }
                }
            }

            let member = state.require_member_mut(caller)?;
            match device {
                MediaDevice::Camera => member.has_video_stream = enabled,
                MediaDevice::Microphone => member.has_audio_stream = enabled,
                MediaDevice::ScreenSharing => member.has_screen_stream = enabled,
            }
            Ok(state.member_ids())
        })?;

        self.notify_device_state(&member_ids, room_id, caller, device, enabled, ChangeReason::BySelf);
        Ok(())
    }

    /// Force-close a member's device (admin only)
    pub fn close_remote_device_by_admin(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        user_id: &UserId,
        device: MediaDevice,
    ) -> Result<()> {
        let member_ids = self.store.with_room(room_id, |state| {
            state.require_admin(caller)?;
            let member = state
                .members
                .get_mut(user_id)
                .ok_or_else(|| Error::UserNotExist(user_id.to_string()))?;
            match device {
                MediaDevice::Camera => member.has_video_stream = false,
                MediaDevice::Microphone => member.has_audio_stream = false,
                MediaDevice::ScreenSharing => member.has_screen_stream = false,
            }
            Ok(state.member_ids())
        })?;

        self.notify_device_state(&member_ids, room_id, user_id, device, false, ChangeReason::ByAdmin);
        Ok(())
    }

    fn notify_device_state(
        &self,
        member_ids: &[UserId],
        _room_id: &RoomId,
        user_id: &UserId,
        device: MediaDevice,
        enabled: bool,
        reason: ChangeReason,
    ) {
        self.observers.notify_users(member_ids.iter(), |observer| match device {
            MediaDevice::Camera | MediaDevice::ScreenSharing => {
                observer.on_user_video_state_changed(user_id, enabled, reason);
            }
            MediaDevice::Microphone => {
                observer.on_user_audio_state_changed(user_id, enabled, reason);
            }
        });
    }

    // --- Messages ---

    pub fn send_text_message(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        text: &str,
        extension_info: HashMap<String, String>,
    ) -> Result<TextMessage> {
        if text.is_empty() {
            return Err(Error::InvalidParameter(
                "message text cannot be empty".to_string(),
            ));
        }
        let (message, others) = self.store.with_room(room_id, |state| {
            let sender = self.check_can_send_message(state, caller)?;
            let message = TextMessage {
                room_id: room_id.clone(),
                sender,
                sequence: state.next_sequence(),
                timestamp: chrono::Utc::now(),
                text_content: text.to_string(),
                extension_info: extension_info.clone(),
            };
            Ok((message, state.member_ids_except(caller)))
        })?;

        self.observers.notify_users(others.iter(), |observer| {
            observer.on_receive_text_message(&message);
        });
        Ok(message)
    }

    pub fn send_custom_message(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        business_id: &str,
        data: &str,
    ) -> Result<CustomMessage> {
        if business_id.is_empty() {
            return Err(Error::InvalidParameter(
                "business id cannot be empty".to_string(),
            ));
        }
        let (message, others) = self.store.with_room(room_id, |state| {
            let sender = self.check_can_send_message(state, caller)?;
            let message = CustomMessage {
                room_id: room_id.clone(),
                sender,
                sequence: state.next_sequence(),
                timestamp: chrono::Utc::now(),
                business_id: business_id.to_string(),
                data: data.to_string(),
            };
            Ok((message, state.member_ids_except(caller)))
        })?;

        self.observers.notify_users(others.iter(), |observer| {
            observer.on_receive_custom_message(&message);
        });
        Ok(message)
    }

    fn check_can_send_message(&self, state: &RoomState, caller: &UserId) -> Result<UserInfo> {
        let sender = state.require_member(caller)?;
        if sender.is_message_disabled {
            return Err(Error::SendMessageDisabledForCurrent);
        }
        if state.info.is_message_disable_for_all_user && !sender.role.is_admin() {
            return Err(Error::SendMessageDisabledForAll);
        }
        Ok(sender.clone())
    }

    // --- Internal ---

    /// Remove a member against their will (limit eviction, server kick)
    fn force_leave(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        reason: KickedOutReason,
        message: &str,
    ) -> Result<()> {
        let (left, vacated, remaining) = self.store.with_room(room_id, |state| {
            let left = state
                .remove_member(user_id)
                .ok_or(Error::UserNotEntered)?;
            let vacated = vacate_seat_of(state, user_id);
            Ok((left, vacated, state.member_ids()))
        })?;

        self.store.record_leave(user_id, room_id);
        self.observers.notify_user(user_id, |observer| {
            observer.on_kicked_out_of_room(room_id, reason, message);
        });
        self.notify_member_left(room_id, &left, vacated.as_ref(), &remaining);
        Ok(())
    }

    fn notify_member_left(
        &self,
        room_id: &RoomId,
        left: &UserInfo,
        vacated: Option<&Vec<SeatInfo>>,
        remaining: &[UserId],
    ) {
        self.observers.notify_users(remaining.iter(), |observer| {
            observer.on_remote_user_leave_room(room_id, left);
        });
        self.observers.notify_users(remaining.iter(), |observer| {
            observer.on_room_user_count_changed(room_id, remaining.len());
        });
        if let Some(left_seats) = vacated {
            let seat_list = match self
                .store
                .read_room(room_id, |state| Ok(state.seats.clone()))
            {
                Ok(list) => list,
                Err(_) => return,
            };
            self.observers.notify_users(remaining.iter(), |observer| {
                observer.on_seat_list_changed(&seat_list, &[], left_seats);
            });
        }
    }
}

/// Vacate the seat a departing user held, returning the `left` delta
pub(crate) fn vacate_seat_of(state: &mut RoomState, user_id: &UserId) -> Option<Vec<SeatInfo>> {
    let index = state.seat_index_of(user_id)?;
    let before = state.seats[index].clone();
    state.seats[index].vacate();
    Some(vec![before])
}
