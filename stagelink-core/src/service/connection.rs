//! Cross-room connection manager
//!
//! Links live rooms together (co-streaming). The request tracker is
//! instantiated with a connection payload; the target room's owner
//! accepts or rejects on behalf of their room.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RoomConfig;
use crate::error::{Error, Result};
use crate::events::{ConnectionObserver, ObserverHub};
use crate::models::{ConnectionCode, ConnectionUser, RequestId, RequestOutcome, RoomId, RoomType, UserId};

use super::request::RequestTracker;
use super::store::RoomStore;

/// Payload carried by every tracked connection request
#[derive(Debug, Clone)]
pub struct ConnectionSignal {
    pub inviter: ConnectionUser,
    pub invitee_room: RoomId,
    pub extension_info: String,
}

/// Connection service for live rooms
#[derive(Clone)]
pub struct ConnectionService {
    store: Arc<RoomStore>,
    observers: Arc<ObserverHub<dyn ConnectionObserver>>,
    tracker: RequestTracker<ConnectionSignal>,
    /// Connected peers per room (symmetric)
    connections: Arc<DashMap<RoomId, Vec<ConnectionUser>>>,
    /// request id per (inviter room, invitee room)
    pending: Arc<DashMap<(RoomId, RoomId), RequestId>>,
    config: RoomConfig,
}

impl std::fmt::Debug for ConnectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionService")
            .field("connected_rooms", &self.connections.len())
            .finish()
    }
}

impl ConnectionService {
    pub fn new(
        store: Arc<RoomStore>,
        observers: Arc<ObserverHub<dyn ConnectionObserver>>,
        config: RoomConfig,
    ) -> Self {
        Self {
            store,
            observers,
            tracker: RequestTracker::new(),
            connections: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Request connections from `room_id` to each room in
    /// `target_room_ids` (room owner only).
    ///
    /// Returns a per-room result code; only `Success` entries produce a
    /// tracked request.
    pub fn request_connection(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        target_room_ids: &[RoomId],
        timeout: Duration,
        extension_info: &str,
    ) -> Result<HashMap<RoomId, ConnectionCode>> {
        if target_room_ids.is_empty() {
            return Err(Error::InvalidParameter(
                "target room list cannot be empty".to_string(),
            ));
        }
        let inviter = self.room_connection_user(room_id, caller)?;

        let mut results = HashMap::new();
        for target in target_room_ids {
            if target == room_id {
                results.insert(target.clone(), ConnectionCode::RoomNotExist);
                continue;
            }
            let code = self.classify_target(room_id, target);
            if code != ConnectionCode::Success {
                results.insert(target.clone(), code);
                continue;
            }
            if self.connected_rooms(room_id).len() + self.pending_from(room_id)
                >= self.config.max_connected_room_count
            {
                results.insert(target.clone(), ConnectionCode::Full);
                continue;
            }

            let target_owner = match self
                .store
                .read_room(target, |state| Ok(state.info.owner_id.clone()))
            {
                Ok(owner) => owner,
                Err(_) => {
                    results.insert(target.clone(), ConnectionCode::RoomNotExist);
                    continue;
                }
            };

            let signal = ConnectionSignal {
                inviter: inviter.clone(),
                invitee_room: target.clone(),
                extension_info: extension_info.to_string(),
            };
            let service = self.clone();
            let handle = match self.tracker.issue_with_hook(
                signal,
                caller.clone(),
                vec![target_owner.clone()],
                timeout,
                Box::new(move |tracked, outcome| {
                    if matches!(outcome, RequestOutcome::TimedOut) {
                        service.on_request_timed_out(tracked);
                    }
                }),
            ) {
                Ok(handle) => handle,
                Err(_) => {
                    results.insert(target.clone(), ConnectionCode::Retry);
                    continue;
                }
            };
            self.pending.insert(
                (room_id.clone(), target.clone()),
                handle.request_id().clone(),
            );

            let invitee = ConnectionUser::new(target.clone(), target_owner.clone(), String::new());
            let inviter_for_event = inviter.clone();
            let extension = extension_info.to_string();
            self.notify_room(target, move |observer| {
                observer.on_connection_request_received(
                    &inviter_for_event,
                    std::slice::from_ref(&invitee),
                    &extension,
                );
            });
            results.insert(target.clone(), ConnectionCode::Success);
        }
        Ok(results)
    }

    /// Cancel pending connection requests issued by `room_id`
    pub fn cancel_connection_request(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        target_room_ids: &[RoomId],
    ) -> Result<()> {
        for target in target_room_ids {
            let Some((_, request_id)) =
                self.pending.remove(&(room_id.clone(), target.clone()))
            else {
                continue;
            };
            let tracked = self.tracker.cancel(caller, &request_id)?;
            let inviter = tracked.payload.inviter.clone();
            self.notify_room(target, move |observer| {
                observer.on_connection_request_cancelled(&inviter);
            });
        }
        Ok(())
    }

    /// Accept the pending request from `inviter_room` on behalf of
    /// `own_room` (owner only). Both rooms become connected and observe
    /// the updated peer list.
    pub fn accept_connection(
        &self,
        caller: &UserId,
        own_room: &RoomId,
        inviter_room: &RoomId,
    ) -> Result<()> {
        let invitee = self.room_connection_user(own_room, caller)?;
        let (_, request_id) = self
            .pending
            .remove(&(inviter_room.clone(), own_room.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.respond(caller, &request_id, true, "")?;
        let inviter = tracked.payload.inviter.clone();

        // Symmetric link
        self.connections
            .entry(inviter_room.clone())
            .or_default()
            .push(invitee.clone());
        self.connections
            .entry(own_room.clone())
            .or_default()
            .push(inviter.clone());

        let inviter_list = self.connected_rooms(inviter_room);
        let own_list = self.connected_rooms(own_room);
        let joined_on_inviter_side = vec![invitee.clone()];
        let joined_on_own_side = vec![inviter.clone()];
        self.notify_room(inviter_room, move |observer| {
            observer.on_connection_request_accept(&invitee);
            observer.on_connection_user_list_changed(&inviter_list, &joined_on_inviter_side, &[]);
        });
        self.notify_room(own_room, move |observer| {
            observer.on_connection_user_list_changed(&own_list, &joined_on_own_side, &[]);
        });
        Ok(())
    }

    /// Reject the pending request from `inviter_room` on behalf of
    /// `own_room` (owner only)
    pub fn reject_connection(
        &self,
        caller: &UserId,
        own_room: &RoomId,
        inviter_room: &RoomId,
    ) -> Result<()> {
        let invitee = self.room_connection_user(own_room, caller)?;
        let (_, request_id) = self
            .pending
            .remove(&(inviter_room.clone(), own_room.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        self.tracker.respond(caller, &request_id, false, "")?;

        self.notify_room(inviter_room, move |observer| {
            observer.on_connection_request_reject(&invitee);
        });
        Ok(())
    }

    /// Leave every connection `own_room` participates in (owner only)
    pub fn disconnect(&self, caller: &UserId, own_room: &RoomId) -> Result<()> {
        let own_user = self.room_connection_user(own_room, caller)?;
        let Some((_, peers)) = self.connections.remove(own_room) else {
            return Ok(());
        };

        for peer in &peers {
            let peer_room = peer.room_id.clone();
            let mut removed = None;
            if let Some(mut list) = self.connections.get_mut(&peer_room) {
                if let Some(pos) = list.iter().position(|user| user.room_id == *own_room) {
                    removed = Some(list.remove(pos));
                }
            }
            if let Some(removed) = removed {
                let remaining = self.connected_rooms(&peer_room);
                let leaved = vec![removed];
                self.notify_room(&peer_room, move |observer| {
                    observer.on_connection_user_list_changed(&remaining, &[], &leaved);
                });
            }
        }

        let leaved = peers;
        let own_user_room = own_user.room_id;
        self.notify_room(&own_user_room, move |observer| {
            observer.on_connection_user_list_changed(&[], &[], &leaved);
        });
        Ok(())
    }

    /// Current peers of a room
    pub fn connected_rooms(&self, room_id: &RoomId) -> Vec<ConnectionUser> {
        self.connections
            .get(room_id)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    fn pending_from(&self, room_id: &RoomId) -> usize {
        self.tracker
            .pending_matching(|tracked| tracked.payload.inviter.room_id == *room_id)
            .len()
    }

    fn classify_target(&self, room_id: &RoomId, target: &RoomId) -> ConnectionCode {
        if !self.store.contains(target) {
            return ConnectionCode::RoomNotExist;
        }
        let is_live = self
            .store
            .read_room(target, |state| Ok(state.info.room_type == RoomType::Live))
            .unwrap_or(false);
        if !is_live {
            return ConnectionCode::RoomNotExist;
        }
        if self.pending.contains_key(&(room_id.clone(), target.clone()))
            || self
                .connected_rooms(room_id)
                .iter()
                .any(|user| user.room_id == *target)
        {
            return ConnectionCode::Connecting;
        }
        // A room linked elsewhere cannot be invited into a second group
        if !self.connected_rooms(target).is_empty()
            || self
                .pending
                .iter()
                .any(|entry| entry.key().1 == *target)
        {
            return ConnectionCode::ConnectingOtherRoom;
        }
        ConnectionCode::Success
    }

    fn on_request_timed_out(&self, tracked: &super::request::TrackedRequest<ConnectionSignal>) {
        let inviter = tracked.payload.inviter.clone();
        let invitee_room = tracked.payload.invitee_room.clone();
        self.pending
            .remove(&(inviter.room_id.clone(), invitee_room.clone()));

        let invitee_owner = self
            .store
            .read_room(&invitee_room, |state| Ok(state.info.owner_id.clone()))
            .unwrap_or_else(|_| UserId::from(""));
        let invitee = ConnectionUser::new(invitee_room.clone(), invitee_owner, String::new());
        let inviter_room = inviter.room_id.clone();
        let inviter_for_invitee = inviter.clone();
        let invitee_for_inviter = invitee.clone();
        self.notify_room(&inviter_room, move |observer| {
            observer.on_connection_request_timeout(&inviter, &invitee_for_inviter);
        });
        let invitee_room_for_event = invitee_room;
        self.notify_room(&invitee_room_for_event, move |observer| {
            observer.on_connection_request_timeout(&inviter_for_invitee, &invitee);
        });
    }

    /// Build the connection identity of a room, verifying the caller owns
    /// it and the room is a live room
    fn room_connection_user(&self, room_id: &RoomId, caller: &UserId) -> Result<ConnectionUser> {
        self.store.read_room(room_id, |state| {
            if state.info.room_type != RoomType::Live {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            let owner = state.require_owner(caller)?;
            Ok(ConnectionUser::new(
                room_id.clone(),
                owner.user_id.clone(),
                owner.user_name.clone(),
            ))
        })
    }

    fn notify_room(&self, room_id: &RoomId, deliver: impl Fn(&(dyn ConnectionObserver + 'static))) {
        let members = self
            .store
            .read_room(room_id, |state| Ok(state.member_ids()))
            .unwrap_or_default();
        self.observers.notify_users(members.iter(), deliver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DuplicatePolicy;
    use crate::models::{EnterRoomOptions, LoginUserInfo, RoomInfo};
    use crate::service::room::RoomService;

    struct Fixture {
        connections: ConnectionService,
        host_a: UserId,
        host_b: UserId,
    }

    fn live_room(rooms: &RoomService, host: &str, room: &str) -> UserId {
        let profile = LoginUserInfo {
            user_id: UserId::from(host),
            user_name: host.to_string(),
            avatar_url: String::new(),
        };
        let info = RoomInfo::new(RoomId::from(room), RoomType::Live);
        rooms.create_room(&profile, info).unwrap();
        rooms
            .enter_room(
                &profile,
                &RoomId::from(room),
                RoomType::Live,
                &EnterRoomOptions::default(),
            )
            .unwrap();
        profile.user_id
    }

    fn fixture() -> Fixture {
        let store = Arc::new(RoomStore::new());
        let hub: Arc<ObserverHub<dyn ConnectionObserver>> =
            Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let room_hub = Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let rooms = RoomService::new(store.clone(), room_hub, RoomConfig::default());
        let connections = ConnectionService::new(store, hub, RoomConfig::default());

        let host_a = live_room(&rooms, "host-a", "live-a");
        let host_b = live_room(&rooms, "host-b", "live-b");
        Fixture {
            connections,
            host_a,
            host_b,
        }
    }

    #[tokio::test]
    async fn test_connection_roundtrip() {
        let fixture = fixture();
        let live_a = RoomId::from("live-a");
        let live_b = RoomId::from("live-b");

        let results = fixture
            .connections
            .request_connection(
                &fixture.host_a,
                &live_a,
                &[live_b.clone()],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        assert_eq!(results.get(&live_b), Some(&ConnectionCode::Success));

        fixture
            .connections
            .accept_connection(&fixture.host_b, &live_b, &live_a)
            .unwrap();

        assert_eq!(fixture.connections.connected_rooms(&live_a).len(), 1);
        assert_eq!(fixture.connections.connected_rooms(&live_b).len(), 1);
        assert_eq!(
            fixture.connections.connected_rooms(&live_a)[0].room_id,
            live_b
        );
    }

    #[tokio::test]
    async fn test_request_codes() {
        let fixture = fixture();
        let live_a = RoomId::from("live-a");
        let live_b = RoomId::from("live-b");

        let results = fixture
            .connections
            .request_connection(
                &fixture.host_a,
                &live_a,
                &[
                    live_b.clone(),
                    RoomId::from("missing"),
                    live_a.clone(),
                ],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        assert_eq!(results.get(&live_b), Some(&ConnectionCode::Success));
        assert_eq!(
            results.get(&RoomId::from("missing")),
            Some(&ConnectionCode::RoomNotExist)
        );
        assert_eq!(results.get(&live_a), Some(&ConnectionCode::RoomNotExist));

        // Re-inviting a room with a pending request reports Connecting
        let results = fixture
            .connections
            .request_connection(
                &fixture.host_a,
                &live_a,
                &[live_b.clone()],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        assert_eq!(results.get(&live_b), Some(&ConnectionCode::Connecting));
    }

    #[tokio::test]
    async fn test_reject_connection() {
        let fixture = fixture();
        let live_a = RoomId::from("live-a");
        let live_b = RoomId::from("live-b");

        fixture
            .connections
            .request_connection(
                &fixture.host_a,
                &live_a,
                &[live_b.clone()],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        fixture
            .connections
            .reject_connection(&fixture.host_b, &live_b, &live_a)
            .unwrap();

        assert!(fixture.connections.connected_rooms(&live_a).is_empty());
        // No pending request remains
        assert_eq!(
            fixture
                .connections
                .accept_connection(&fixture.host_b, &live_b, &live_a)
                .unwrap_err(),
            Error::RequestIdInvalid
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_both_sides() {
        let fixture = fixture();
        let live_a = RoomId::from("live-a");
        let live_b = RoomId::from("live-b");

        fixture
            .connections
            .request_connection(
                &fixture.host_a,
                &live_a,
                &[live_b.clone()],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        fixture
            .connections
            .accept_connection(&fixture.host_b, &live_b, &live_a)
            .unwrap();
        fixture
            .connections
            .disconnect(&fixture.host_a, &live_a)
            .unwrap();

        assert!(fixture.connections.connected_rooms(&live_a).is_empty());
        assert!(fixture.connections.connected_rooms(&live_b).is_empty());
    }

    #[tokio::test]
    async fn test_busy_room_reports_connecting_other_room() {
        let store = Arc::new(RoomStore::new());
        let hub: Arc<ObserverHub<dyn ConnectionObserver>> =
            Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let room_hub = Arc::new(ObserverHub::new(DuplicatePolicy::DeliverTwice));
        let rooms = RoomService::new(store.clone(), room_hub, RoomConfig::default());
        let connections = ConnectionService::new(store, hub, RoomConfig::default());
        let host_a = live_room(&rooms, "host-a", "live-a");
        let host_b = live_room(&rooms, "host-b", "live-b");
        let host_c = live_room(&rooms, "host-c", "live-c");

        connections
            .request_connection(
                &host_a,
                &RoomId::from("live-a"),
                &[RoomId::from("live-b")],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        connections
            .accept_connection(&host_b, &RoomId::from("live-b"), &RoomId::from("live-a"))
            .unwrap();

        let results = connections
            .request_connection(
                &host_c,
                &RoomId::from("live-c"),
                &[RoomId::from("live-b")],
                Duration::from_secs(30),
                "",
            )
            .unwrap();
        assert_eq!(
            results.get(&RoomId::from("live-b")),
            Some(&ConnectionCode::ConnectingOtherRoom)
        );
    }

    #[tokio::test]
    async fn test_connection_requires_owner() {
        let fixture = fixture();
        assert_eq!(
            fixture
                .connections
                .request_connection(
                    &fixture.host_b,
                    &RoomId::from("live-a"),
                    &[RoomId::from("live-b")],
                    Duration::from_secs(30),
                    "",
                )
                .unwrap_err(),
            Error::UserNotEntered
        );
    }
}
