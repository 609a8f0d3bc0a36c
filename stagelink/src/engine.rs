//! Room engine facade
//!
//! A caller-owned handle binding one logged-in user to a deployment's
//! services. Several engines built over the same [`Services`] model
//! several participants of the same deployment; there is no process-wide
//! singleton.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stagelink_core::config::Config;
use stagelink_core::error::{Error, Result};
use stagelink_core::events::{
    BattleObserver, ConnectionObserver, InvitationObserver, RoomObserver,
};
use stagelink_core::models::{
    BattleCode, BattleConfig, BattleId, BattleInfo, ConnectionCode, CustomMessage,
    EnterRoomOptions, Invitation, InvitationCode, InvitationRejectedReason, LoginUserInfo,
    MediaDevice, MoveSeatPolicy, Request, RequestId, Role, RoomId, RoomInfo, RoomType, SeatInfo,
    SeatLockParams, SeatMode, TextMessage, UserId, UserInfo,
};
use stagelink_core::service::{AcceptAnySig, Authenticator, RoomRequestHandle, Services};

use crate::media::{AudioQuality, MediaEngine, NullMedia, VideoQuality, VideoStreamType};

struct EngineInner {
    services: Services,
    media: Arc<dyn MediaEngine>,
    user: RwLock<Option<LoginUserInfo>>,
    current_room: RwLock<Option<RoomId>>,
    /// Fatal error latched until re-login
    fatal: RwLock<Option<Error>>,
}

/// Room engine handle, cheap to clone
#[derive(Clone)]
pub struct RoomEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for RoomEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomEngine")
            .field("user", &*self.inner.user.read())
            .field("current_room", &*self.inner.current_room.read())
            .finish()
    }
}

/// Builder for [`RoomEngine`]
pub struct RoomEngineBuilder {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    media: Arc<dyn MediaEngine>,
    services: Option<Services>,
}

impl Default for RoomEngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            authenticator: Arc::new(AcceptAnySig),
            media: Arc::new(NullMedia),
            services: None,
        }
    }
}

impl RoomEngineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaEngine>) -> Self {
        self.media = media;
        self
    }

    /// Bind to an existing deployment instead of creating a fresh one.
    /// Engines sharing the same services see each other's rooms and
    /// events.
    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    pub fn build(self) -> RoomEngine {
        let services = self
            .services
            .unwrap_or_else(|| Services::new(&self.config, self.authenticator));
        RoomEngine {
            inner: Arc::new(EngineInner {
                services,
                media: self.media,
                user: RwLock::new(None),
                current_room: RwLock::new(None),
                fatal: RwLock::new(None),
            }),
        }
    }
}

impl RoomEngine {
    pub fn builder() -> RoomEngineBuilder {
        RoomEngineBuilder::default()
    }

    /// The deployment this engine is bound to, for sharing with further
    /// engines
    pub fn services(&self) -> Services {
        self.inner.services.clone()
    }

    // --- Session ---

    /// Validate credentials and bind this engine to `user_id`
    pub async fn login(&self, sdk_app_id: u32, user_id: UserId, user_sig: &str) -> Result<()> {
        let profile = self.latch(
            self.inner
                .services
                .sessions
                .login(sdk_app_id, user_id, user_sig)
                .await,
        )?;
        *self.inner.user.write() = Some(profile);
        *self.inner.fatal.write() = None;
        Ok(())
    }

    /// Leave every joined room, drop observers, and end the session
    pub async fn logout(&self) -> Result<()> {
        let profile = self.current_user()?;
        for room_id in self.inner.services.rooms.joined_rooms(&profile.user_id) {
            let result = match self
                .inner
                .services
                .rooms
                .fetch_room_info(&room_id)
                .map(|info| info.owner_id == profile.user_id)
            {
                Ok(true) => self
                    .inner
                    .services
                    .rooms
                    .destroy_room(&profile.user_id, &room_id),
                Ok(false) => self.inner.services.rooms.exit_room(&profile.user_id, &room_id),
                Err(error) => Err(error),
            };
            if let Err(error) = result {
                tracing::warn!(room_id = %room_id, %error, "failed to leave room during logout");
            }
        }

        self.inner.services.room_observers.drop_user(&profile.user_id);
        self.inner
            .services
            .invitation_observers
            .drop_user(&profile.user_id);
        self.inner
            .services
            .connection_observers
            .drop_user(&profile.user_id);
        self.inner.services.battle_observers.drop_user(&profile.user_id);

        self.inner.services.sessions.logout(&profile.user_id)?;
        *self.inner.user.write() = None;
        *self.inner.current_room.write() = None;
        Ok(())
    }

    pub fn get_self_info(&self) -> Result<LoginUserInfo> {
        self.current_user()
    }

    pub async fn set_self_info(&self, user_name: &str, avatar_url: &str) -> Result<()> {
        let profile = self.current_user()?;
        let updated = self
            .inner
            .services
            .sessions
            .set_self_info(&profile.user_id, user_name, avatar_url)?;
        *self.inner.user.write() = Some(updated);
        Ok(())
    }

    // --- Observers ---

    pub fn add_observer(&self, observer: Arc<dyn RoomObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .room_observers
            .add_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn remove_observer(&self, observer: &Arc<dyn RoomObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .room_observers
            .remove_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn add_invitation_observer(&self, observer: Arc<dyn InvitationObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .invitation_observers
            .add_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn remove_invitation_observer(&self, observer: &Arc<dyn InvitationObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .invitation_observers
            .remove_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn add_connection_observer(&self, observer: Arc<dyn ConnectionObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .connection_observers
            .add_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn remove_connection_observer(&self, observer: &Arc<dyn ConnectionObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .connection_observers
            .remove_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn add_battle_observer(&self, observer: Arc<dyn BattleObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .battle_observers
            .add_observer(&profile.user_id, observer);
        Ok(())
    }

    pub fn remove_battle_observer(&self, observer: &Arc<dyn BattleObserver>) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .battle_observers
            .remove_observer(&profile.user_id, observer);
        Ok(())
    }

    // --- Room lifecycle ---

    pub async fn create_room(&self, info: RoomInfo) -> Result<RoomInfo> {
        let profile = self.current_user()?;
        self.inner.services.rooms.create_room(&profile, info)
    }

    /// Enter a room; it becomes this engine's current room
    pub async fn enter_room(
        &self,
        room_id: RoomId,
        room_type: RoomType,
        options: EnterRoomOptions,
    ) -> Result<RoomInfo> {
        let profile = self.current_user()?;
        let info = self
            .inner
            .services
            .rooms
            .enter_room(&profile, &room_id, room_type, &options)?;
        *self.inner.current_room.write() = Some(room_id);
        Ok(info)
    }

    /// Leave the current room
    pub async fn exit_room(&self) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.exit_room(&profile.user_id, &room_id)?;
        *self.inner.current_room.write() = None;
        Ok(())
    }

    /// Destroy the current room (owner only)
    pub async fn destroy_room(&self) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .destroy_room(&profile.user_id, &room_id)?;
        *self.inner.current_room.write() = None;
        Ok(())
    }

    /// Current room's state
    pub async fn fetch_room_info(&self) -> Result<RoomInfo> {
        self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.fetch_room_info(&room_id)
    }

    /// Any room's state, callable before entering
    pub async fn fetch_room_info_by_id(&self, room_id: &RoomId) -> Result<RoomInfo> {
        self.current_user()?;
        self.inner.services.rooms.fetch_room_info(room_id)
    }

    pub async fn get_user_list(&self) -> Result<Vec<UserInfo>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .get_user_list(&profile.user_id, &room_id)
    }

    pub async fn get_user_info(&self, user_id: &UserId) -> Result<UserInfo> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .get_user_info(&profile.user_id, &room_id, user_id)
    }

    pub async fn change_user_role(&self, user_id: &UserId, role: Role) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .change_user_role(&profile.user_id, &room_id, user_id, role)
    }

    pub async fn change_user_name_card(&self, user_id: &UserId, name_card: &str) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.change_user_name_card(
            &profile.user_id,
            &room_id,
            user_id,
            name_card,
        )
    }

    pub async fn kick_remote_user_out_of_room(&self, user_id: &UserId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.kick_remote_user_out_of_room(
            &profile.user_id,
            &room_id,
            user_id,
        )
    }

    // --- Admin configuration ---

    pub async fn update_room_name_by_admin(&self, room_name: &str) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .update_room_name_by_admin(&profile.user_id, &room_id, room_name)
    }

    pub async fn update_room_seat_mode_by_admin(&self, seat_mode: SeatMode) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .update_room_seat_mode_by_admin(&profile.user_id, &room_id, seat_mode)
    }

    pub async fn update_room_password_by_admin(&self, password: &str) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .update_room_password_by_admin(&profile.user_id, &room_id, password)
    }

    pub async fn get_room_metadata(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .get_room_metadata(&profile.user_id, &room_id, keys)
    }

    pub async fn set_room_metadata_by_admin(
        &self,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .set_room_metadata_by_admin(&profile.user_id, &room_id, metadata)
    }

    pub async fn disable_device_for_all_user_by_admin(
        &self,
        device: MediaDevice,
        is_disable: bool,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.disable_device_for_all_user_by_admin(
            &profile.user_id,
            &room_id,
            device,
            is_disable,
        )
    }

    pub async fn disable_sending_message_by_admin(
        &self,
        user_id: &UserId,
        is_disable: bool,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.disable_sending_message_by_admin(
            &profile.user_id,
            &room_id,
            user_id,
            is_disable,
        )
    }

    pub async fn disable_sending_message_for_all_user(&self, is_disable: bool) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .disable_sending_message_for_all_user(&profile.user_id, &room_id, is_disable)
    }

    // --- Messages ---

    pub async fn send_text_message(
        &self,
        text: &str,
        extension_info: HashMap<String, String>,
    ) -> Result<TextMessage> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .send_text_message(&profile.user_id, &room_id, text, extension_info)
    }

    pub async fn send_custom_message(&self, business_id: &str, data: &str) -> Result<CustomMessage> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .rooms
            .send_custom_message(&profile.user_id, &room_id, business_id, data)
    }

    // --- Seats ---

    pub async fn get_seat_list(&self) -> Result<Vec<SeatInfo>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .seats
            .get_seat_list(&profile.user_id, &room_id)
    }

    pub async fn get_seat_application_list(&self) -> Result<Vec<Request>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .seats
            .get_seat_application_list(&profile.user_id, &room_id)
    }

    /// Take a seat; `None` picks the lowest free one. `timeout_seconds`
    /// of 0 disables timeout supervision of the application.
    pub async fn take_seat(
        &self,
        seat_index: Option<usize>,
        timeout_seconds: u64,
    ) -> Result<RoomRequestHandle> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.take_seat(
            &profile.user_id,
            &room_id,
            seat_index,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub async fn take_user_on_seat_by_admin(
        &self,
        seat_index: Option<usize>,
        user_id: &UserId,
        timeout_seconds: u64,
    ) -> Result<RoomRequestHandle> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.take_user_on_seat_by_admin(
            &profile.user_id,
            &room_id,
            seat_index,
            user_id,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub async fn leave_seat(&self) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .seats
            .leave_seat(&profile.user_id, &room_id)
    }

    pub async fn move_to_seat(&self, target_seat_index: usize) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .seats
            .move_to_seat(&profile.user_id, &room_id, target_seat_index)
    }

    pub async fn move_user_to_seat_by_admin(
        &self,
        user_id: &UserId,
        target_seat_index: usize,
        policy: MoveSeatPolicy,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.move_user_to_seat_by_admin(
            &profile.user_id,
            &room_id,
            user_id,
            target_seat_index,
            policy,
        )
    }

    pub async fn lock_seat_by_admin(
        &self,
        seat_index: usize,
        params: SeatLockParams,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.lock_seat_by_admin(
            &profile.user_id,
            &room_id,
            seat_index,
            params,
        )
    }

    pub async fn kick_user_off_seat_by_admin(
        &self,
        seat_index: usize,
        user_id: &UserId,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.kick_user_off_seat_by_admin(
            &profile.user_id,
            &room_id,
            seat_index,
            user_id,
        )
    }

    // --- Signaling ---

    pub async fn cancel_request(&self, request_id: &RequestId) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .seats
            .cancel_request(&profile.user_id, request_id)
    }

    pub async fn respond_remote_request(&self, request_id: &RequestId, agree: bool) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .seats
            .respond_request(&profile.user_id, request_id, agree)
    }

    pub async fn open_remote_device_by_admin(
        &self,
        user_id: &UserId,
        device: MediaDevice,
        timeout_seconds: u64,
    ) -> Result<RoomRequestHandle> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.open_remote_device_by_admin(
            &profile.user_id,
            &room_id,
            user_id,
            device,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub async fn apply_to_admin_to_open_local_device(
        &self,
        device: MediaDevice,
        timeout_seconds: u64,
    ) -> Result<RoomRequestHandle> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.seats.apply_to_admin_to_open_local_device(
            &profile.user_id,
            &room_id,
            device,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub async fn close_remote_device_by_admin(
        &self,
        user_id: &UserId,
        device: MediaDevice,
    ) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.rooms.close_remote_device_by_admin(
            &profile.user_id,
            &room_id,
            user_id,
            device,
        )
    }

    // --- Local devices ---

    /// Open the local camera and publish its stream to the room
    pub async fn open_local_camera(&self, is_front: bool, quality: VideoQuality) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.media.open_local_camera(is_front, quality).await?;
        self.inner.services.rooms.set_local_device_state(
            &profile.user_id,
            &room_id,
            MediaDevice::Camera,
            true,
        )
    }

    pub async fn close_local_camera(&self) {
        self.inner.media.close_local_camera().await;
        if let (Ok(profile), Ok(room_id)) = (self.current_user(), self.require_current_room()) {
            let _ = self.inner.services.rooms.set_local_device_state(
                &profile.user_id,
                &room_id,
                MediaDevice::Camera,
                false,
            );
        }
    }

    pub async fn open_local_microphone(&self, quality: AudioQuality) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.media.open_local_microphone(quality).await?;
        self.inner.services.rooms.set_local_device_state(
            &profile.user_id,
            &room_id,
            MediaDevice::Microphone,
            true,
        )
    }

    pub async fn close_local_microphone(&self) {
        self.inner.media.close_local_microphone().await;
        if let (Ok(profile), Ok(room_id)) = (self.current_user(), self.require_current_room()) {
            let _ = self.inner.services.rooms.set_local_device_state(
                &profile.user_id,
                &room_id,
                MediaDevice::Microphone,
                false,
            );
        }
    }

    pub async fn start_screen_capture(&self) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.media.start_screen_capture().await?;
        self.inner.services.rooms.set_local_device_state(
            &profile.user_id,
            &room_id,
            MediaDevice::ScreenSharing,
            true,
        )
    }

    pub async fn stop_screen_capture(&self) {
        self.inner.media.stop_screen_capture().await;
        if let (Ok(profile), Ok(room_id)) = (self.current_user(), self.require_current_room()) {
            let _ = self.inner.services.rooms.set_local_device_state(
                &profile.user_id,
                &room_id,
                MediaDevice::ScreenSharing,
                false,
            );
        }
    }

    pub async fn mute_local_audio(&self, mute: bool) {
        self.inner.media.mute_local_audio(mute).await;
    }

    pub async fn start_play_remote_video(
        &self,
        user_id: &UserId,
        stream_type: VideoStreamType,
    ) -> Result<()> {
        self.current_user()?;
        self.require_current_room()?;
        self.inner
            .media
            .start_play_remote_video(user_id, stream_type)
            .await
    }

    pub async fn stop_play_remote_video(&self, user_id: &UserId, stream_type: VideoStreamType) {
        self.inner.media.stop_play_remote_video(user_id, stream_type).await;
    }

    // --- Conference invitations ---

    pub async fn invite_users(
        &self,
        user_ids: &[UserId],
        timeout_seconds: u64,
        extension_info: &str,
    ) -> Result<HashMap<UserId, InvitationCode>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.invitations.invite_users(
            &profile.user_id,
            &room_id,
            user_ids,
            Duration::from_secs(timeout_seconds),
            extension_info,
        )
    }

    pub async fn cancel_invitation(&self, user_ids: &[UserId]) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .invitations
            .cancel_invitation(&profile.user_id, &room_id, user_ids)
    }

    /// Accept the invitation to `room_id` (the caller is the invitee)
    pub async fn accept_invitation(&self, room_id: &RoomId) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .invitations
            .accept(&profile.user_id, room_id)
    }

    pub async fn reject_invitation(
        &self,
        room_id: &RoomId,
        reason: InvitationRejectedReason,
    ) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .invitations
            .reject(&profile.user_id, room_id, reason)
    }

    pub async fn get_invitation_list(&self) -> Result<Vec<Invitation>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .invitations
            .get_invitation_list(&profile.user_id, &room_id)
    }

    // --- Live connections ---

    pub async fn request_connection(
        &self,
        target_room_ids: &[RoomId],
        timeout_seconds: u64,
        extension_info: &str,
    ) -> Result<HashMap<RoomId, ConnectionCode>> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.connections.request_connection(
            &profile.user_id,
            &room_id,
            target_room_ids,
            Duration::from_secs(timeout_seconds),
            extension_info,
        )
    }

    pub async fn cancel_connection_request(&self, target_room_ids: &[RoomId]) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.connections.cancel_connection_request(
            &profile.user_id,
            &room_id,
            target_room_ids,
        )
    }

    pub async fn accept_connection(&self, inviter_room_id: &RoomId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.connections.accept_connection(
            &profile.user_id,
            &room_id,
            inviter_room_id,
        )
    }

    pub async fn reject_connection(&self, inviter_room_id: &RoomId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.connections.reject_connection(
            &profile.user_id,
            &room_id,
            inviter_room_id,
        )
    }

    pub async fn disconnect(&self) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .connections
            .disconnect(&profile.user_id, &room_id)
    }

    // --- Battles ---

    pub async fn request_battle(
        &self,
        config: BattleConfig,
        target_room_ids: &[RoomId],
        timeout_seconds: u64,
    ) -> Result<(BattleInfo, HashMap<RoomId, BattleCode>)> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner.services.battles.request_battle(
            &profile.user_id,
            &room_id,
            config,
            target_room_ids,
            Duration::from_secs(timeout_seconds),
        )
    }

    pub async fn cancel_battle_request(
        &self,
        battle_id: &BattleId,
        room_ids: &[RoomId],
    ) -> Result<()> {
        let profile = self.current_user()?;
        self.inner
            .services
            .battles
            .cancel_battle_request(&profile.user_id, battle_id, room_ids)
    }

    pub async fn accept_battle(&self, battle_id: &BattleId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .battles
            .accept_battle(&profile.user_id, &room_id, battle_id)
    }

    pub async fn reject_battle(&self, battle_id: &BattleId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .battles
            .reject_battle(&profile.user_id, &room_id, battle_id)
    }

    pub async fn exit_battle(&self, battle_id: &BattleId) -> Result<()> {
        let profile = self.current_user()?;
        let room_id = self.require_current_room()?;
        self.inner
            .services
            .battles
            .exit_battle(&profile.user_id, &room_id, battle_id)
    }

    // --- Internal ---

    /// Logged-in profile, or the latched fatal error / not-initialized
    fn current_user(&self) -> Result<LoginUserInfo> {
        if let Some(error) = self.inner.fatal.read().clone() {
            return Err(error);
        }
        self.inner
            .user
            .read()
            .clone()
            .ok_or(Error::SdkNotInitialized)
    }

    fn require_current_room(&self) -> Result<RoomId> {
        self.inner
            .current_room
            .read()
            .clone()
            .ok_or(Error::OperationInvalidBeforeEnterRoom)
    }

    /// Record fatal errors so later operations short-circuit
    fn latch<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_fatal() {
                *self.inner.fatal.write() = Some(error.clone());
            }
        }
        result
    }
}
