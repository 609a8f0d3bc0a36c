//! In-memory room store
//!
//! Authoritative state of every live room, shared by the room and seat
//! services. Each room's state sits behind its own lock; cross-room
//! operations take one room lock at a time.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Role, RoomId, RoomInfo, RoomType, SeatInfo, UserId, UserInfo};

/// Mutable state of one room
pub struct RoomState {
    pub info: RoomInfo,
    pub members: HashMap<UserId, UserInfo>,
    /// Join order, used for listings
    pub member_order: Vec<UserId>,
    pub seats: Vec<SeatInfo>,
    pub metadata: HashMap<String, String>,
    pub next_message_sequence: u64,
}

impl RoomState {
    pub fn new(info: RoomInfo) -> Self {
        let seats = (0..info.max_seat_count)
            .map(|index| SeatInfo::vacant(info.room_id.clone(), index))
            .collect();
        Self {
            info,
            members: HashMap::new(),
            member_order: Vec::new(),
            seats,
            metadata: HashMap::new(),
            next_message_sequence: 0,
        }
    }

    pub fn member(&self, user_id: &UserId) -> Option<&UserInfo> {
        self.members.get(user_id)
    }

    pub fn require_member(&self, user_id: &UserId) -> Result<&UserInfo> {
        self.members.get(user_id).ok_or(Error::UserNotEntered)
    }

    pub fn require_member_mut(&mut self, user_id: &UserId) -> Result<&mut UserInfo> {
        self.members.get_mut(user_id).ok_or(Error::UserNotEntered)
    }

    /// Caller must be a member with Owner or Administrator role
    pub fn require_admin(&self, user_id: &UserId) -> Result<&UserInfo> {
        let member = self.require_member(user_id)?;
        if !member.role.is_admin() {
            return Err(Error::UserNeedAdminPermission);
        }
        Ok(member)
    }

    /// Caller must be the room owner
    pub fn require_owner(&self, user_id: &UserId) -> Result<&UserInfo> {
        let member = self.require_member(user_id)?;
        if member.role != Role::Owner {
            return Err(Error::UserNeedOwnerPermission);
        }
        Ok(member)
    }

    pub fn admins(&self) -> Vec<UserId> {
        self.member_order
            .iter()
            .filter(|id| {
                self.members
                    .get(id)
                    .is_some_and(|member| member.role.is_admin())
            })
            .cloned()
            .collect()
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.member_order.clone()
    }

    /// Member ids except `excluded`
    pub fn member_ids_except(&self, excluded: &UserId) -> Vec<UserId> {
        self.member_order
            .iter()
            .filter(|id| *id != excluded)
            .cloned()
            .collect()
    }

    pub fn add_member(&mut self, user: UserInfo) {
        let user_id = user.user_id.clone();
        if self.members.insert(user_id.clone(), user).is_none() {
            self.member_order.push(user_id);
        }
        self.info.member_count = self.members.len();
    }

    pub fn remove_member(&mut self, user_id: &UserId) -> Option<UserInfo> {
        let removed = self.members.remove(user_id);
        if removed.is_some() {
            self.member_order.retain(|id| id != user_id);
            self.info.member_count = self.members.len();
        }
        removed
    }

    // --- Seat helpers ---

    pub fn seat(&self, index: usize) -> Result<&SeatInfo> {
        self.seats.get(index).ok_or(Error::SeatIndexNotExist)
    }

    pub fn seat_mut(&mut self, index: usize) -> Result<&mut SeatInfo> {
        self.seats.get_mut(index).ok_or(Error::SeatIndexNotExist)
    }

    pub fn seat_index_of(&self, user_id: &UserId) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.user_id.as_ref() == Some(user_id))
    }

    /// Lowest vacant, unlocked seat index
    pub fn first_free_seat(&self) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| !seat.is_occupied() && !seat.is_locked)
    }

    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_message_sequence;
        self.next_message_sequence += 1;
        sequence
    }
}

/// All live rooms plus the per-user joined-room index
pub struct RoomStore {
    rooms: DashMap<RoomId, Arc<RwLock<RoomState>>>,
    /// Rooms each user is currently in, in join order
    joined: DashMap<UserId, Vec<RoomId>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            joined: DashMap::new(),
        }
    }

    /// Insert a new room; fails when the id is taken.
    pub fn insert(&self, state: RoomState) -> Result<()> {
        let room_id = state.info.room_id.clone();
        match self.rooms.entry(room_id) {
            Entry::Occupied(_) => Err(Error::RoomIdOccupied),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(state)));
                Ok(())
            }
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Result<Arc<RwLock<RoomState>>> {
        self.rooms
            .get(room_id)
            .map(|room| room.clone())
            .ok_or(Error::RoomIdNotExist)
    }

    pub fn remove(&self, room_id: &RoomId) -> Result<Arc<RwLock<RoomState>>> {
        self.rooms
            .remove(room_id)
            .map(|(_, room)| room)
            .ok_or(Error::RoomIdNotExist)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Run `f` with the room's state write-locked
    pub fn with_room<R>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut RoomState) -> Result<R>,
    ) -> Result<R> {
        let room = self.get(room_id)?;
        let mut state = room.write();
        f(&mut state)
    }

    /// Run `f` with the room's state read-locked
    pub fn read_room<R>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&RoomState) -> Result<R>,
    ) -> Result<R> {
        let room = self.get(room_id)?;
        let state = room.read();
        f(&state)
    }

    // --- Joined-room index ---

    /// Rooms `user` is in, join order
    pub fn joined_rooms(&self, user: &UserId) -> Vec<RoomId> {
        self.joined
            .get(user)
            .map(|rooms| rooms.clone())
            .unwrap_or_default()
    }

    pub fn record_join(&self, user: &UserId, room_id: RoomId) {
        self.joined.entry(user.clone()).or_default().push(room_id);
    }

    pub fn record_leave(&self, user: &UserId, room_id: &RoomId) {
        if let Some(mut rooms) = self.joined.get_mut(user) {
            rooms.retain(|id| id != room_id);
        }
    }

    /// Oldest joined room of `room_type` for `user`, present only when
    /// the user exceeds that type's per-device limit.
    pub fn eviction_candidate(&self, user: &UserId, room_type: RoomType) -> Option<RoomId> {
        let joined = self.joined_rooms(user);
        let of_type: Vec<RoomId> = joined
            .into_iter()
            .filter(|room_id| {
                self.rooms
                    .get(room_id)
                    .is_some_and(|room| room.read().info.room_type == room_type)
            })
            .collect();
        if of_type.len() > room_type.joined_room_limit() {
            of_type.into_iter().next()
        } else {
            None
        }
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
