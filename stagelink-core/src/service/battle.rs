//! Battle manager
//!
//! Scored, time-boxed competitions between connected live rooms. One more
//! instantiation of the request tracker, here with a battle payload; the
//! battle itself has a duration supervisor that ends it with `TimeOver`.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::events::{BattleObserver, ObserverHub};
use crate::models::{
    BattleCode, BattleConfig, BattleId, BattleInfo, BattleStoppedReason, BattleUser, RequestId,
    RequestOutcome, RoomId, RoomType, UserId,
};

use super::request::RequestTracker;
use super::store::RoomStore;

/// Payload carried by every tracked battle request
#[derive(Debug, Clone)]
pub struct BattleSignal {
    pub battle_id: BattleId,
    pub inviter: BattleUser,
    pub invitee: BattleUser,
}

struct ActiveBattle {
    info: BattleInfo,
    /// Rooms that joined (inviter included once started)
    participants: Vec<BattleUser>,
    started: bool,
}

/// Battle service for live rooms
#[derive(Clone)]
pub struct BattleService {
    store: Arc<RoomStore>,
    observers: Arc<ObserverHub<dyn BattleObserver>>,
    tracker: RequestTracker<BattleSignal>,
    battles: Arc<DashMap<BattleId, Arc<RwLock<ActiveBattle>>>>,
    /// request id per (battle, invitee room)
    pending: Arc<DashMap<(BattleId, RoomId), RequestId>>,
}

impl std::fmt::Debug for BattleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleService")
            .field("battles", &self.battles.len())
            .finish()
    }
}

impl BattleService {
    pub fn new(store: Arc<RoomStore>, observers: Arc<ObserverHub<dyn BattleObserver>>) -> Self {
        Self {
            store,
            observers,
            tracker: RequestTracker::new(),
            battles: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Start a battle request from `room_id` to each room in
    /// `target_room_ids` (room owner only).
    ///
    /// With `config.need_response` false the invitees join immediately
    /// and the battle starts without waiting.
    pub fn request_battle(
        &self,
        caller: &UserId,
        room_id: &RoomId,
        config: BattleConfig,
        target_room_ids: &[RoomId],
        timeout: Duration,
    ) -> Result<(BattleInfo, HashMap<RoomId, BattleCode>)> {
        if target_room_ids.is_empty() {
            return Err(Error::InvalidParameter(
                "target room list cannot be empty".to_string(),
            ));
        }
        let inviter = self.room_battle_user(room_id, caller)?;
        if self.battle_of_room(room_id).is_some() {
            return Err(Error::RepeatOperation);
        }

        let mut invitees = Vec::new();
        let mut results = HashMap::new();
        for target in target_room_ids {
            if target == room_id {
                results.insert(target.clone(), BattleCode::RoomNotExist);
                continue;
            }
            match self.classify_target(target) {
                BattleCode::Success => {
                    let owner = self
                        .store
                        .read_room(target, |state| Ok(state.info.owner_id.clone()))?;
                    invitees.push(BattleUser::new(target.clone(), owner, String::new()));
                }
                code => {
                    results.insert(target.clone(), code);
                }
            }
        }
        if invitees.is_empty() {
            return Err(Error::InvalidParameter(
                "no target room can join the battle".to_string(),
            ));
        }

        let need_response = config.need_response;
        let info = BattleInfo::new(config, inviter.clone(), invitees.clone());
        let battle_id = info.battle_id.clone();
        self.battles.insert(
            battle_id.clone(),
            Arc::new(RwLock::new(ActiveBattle {
                info: info.clone(),
                participants: vec![inviter.clone()],
                started: false,
            })),
        );

        for invitee in &invitees {
            if need_response {
                let signal = BattleSignal {
                    battle_id: battle_id.clone(),
                    inviter: inviter.clone(),
                    invitee: invitee.clone(),
                };
                let service = self.clone();
                let handle = self.tracker.issue_with_hook(
                    signal,
                    caller.clone(),
                    vec![invitee.user_id.clone()],
                    timeout,
                    Box::new(move |tracked, outcome| {
                        if matches!(outcome, RequestOutcome::TimedOut) {
                            service.on_request_timed_out(tracked);
                        }
                    }),
                )?;
                self.pending.insert(
                    (battle_id.clone(), invitee.room_id.clone()),
                    handle.request_id().clone(),
                );

                let info_for_event = info.clone();
                let inviter_for_event = inviter.clone();
                let invitee_for_event = invitee.clone();
                self.notify_room(&invitee.room_id, move |observer| {
                    observer.on_battle_request_received(
                        &info_for_event,
                        &inviter_for_event,
                        &invitee_for_event,
                    );
                });
            } else {
                self.join_battle(&battle_id, invitee.clone());
            }
            results.insert(invitee.room_id.clone(), BattleCode::Success);
        }

        if !need_response {
            self.start_battle(&battle_id);
        }

        Ok((info, results))
    }

    /// Cancel pending battle invitations (inviter only)
    pub fn cancel_battle_request(
        &self,
        caller: &UserId,
        battle_id: &BattleId,
        room_ids: &[RoomId],
    ) -> Result<()> {
        for room_id in room_ids {
            let Some((_, request_id)) =
                self.pending.remove(&(battle_id.clone(), room_id.clone()))
            else {
                continue;
            };
            let tracked = self.tracker.cancel(caller, &request_id)?;
            let signal = tracked.payload;
            if let Some(info) = self.battle_info(battle_id) {
                let invitee_room = signal.invitee.room_id.clone();
                self.notify_room(&invitee_room, move |observer| {
                    observer.on_battle_request_cancelled(&info, &signal.inviter, &signal.invitee);
                });
            }
        }
        self.end_battle_if_abandoned(battle_id);
        Ok(())
    }

    /// Accept a battle invitation on behalf of the caller's room
    pub fn accept_battle(&self, caller: &UserId, own_room: &RoomId, battle_id: &BattleId) -> Result<()> {
        let invitee = self.room_battle_user(own_room, caller)?;
        let (_, request_id) = self
            .pending
            .remove(&(battle_id.clone(), own_room.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.respond(caller, &request_id, true, "")?;
        let signal = tracked.payload;

        let info = self.battle_info(battle_id).ok_or(Error::RequestIdInvalid)?;
        let inviter_room = signal.inviter.room_id.clone();
        let info_for_event = info;
        let signal_inviter = signal.inviter.clone();
        let signal_invitee = signal.invitee.clone();
        self.notify_room(&inviter_room, move |observer| {
            observer.on_battle_request_accept(&info_for_event, &signal_inviter, &signal_invitee);
        });

        self.join_battle(battle_id, invitee);
        self.start_battle(battle_id);
        Ok(())
    }

    /// Reject a battle invitation on behalf of the caller's room
    pub fn reject_battle(&self, caller: &UserId, own_room: &RoomId, battle_id: &BattleId) -> Result<()> {
        self.room_battle_user(own_room, caller)?;
        let (_, request_id) = self
            .pending
            .remove(&(battle_id.clone(), own_room.clone()))
            .ok_or(Error::RequestIdInvalid)?;
        let tracked = self.tracker.respond(caller, &request_id, false, "")?;
        let signal = tracked.payload;

        if let Some(info) = self.battle_info(battle_id) {
            let inviter_room = signal.inviter.room_id.clone();
            self.notify_room(&inviter_room, move |observer| {
                observer.on_battle_request_reject(&info, &signal.inviter, &signal.invitee);
            });
        }
        self.end_battle_if_abandoned(battle_id);
        Ok(())
    }

    /// Leave a running battle; when fewer than two rooms remain the
    /// battle ends with `OtherExit`.
    pub fn exit_battle(&self, caller: &UserId, own_room: &RoomId, battle_id: &BattleId) -> Result<()> {
        self.room_battle_user(own_room, caller)?;
        let battle = self
            .battles
            .get(battle_id)
            .map(|battle| battle.clone())
            .ok_or(Error::RequestIdInvalid)?;

        let (exited, remaining_rooms, ended) = {
            let mut active = battle.write();
            let pos = active
                .participants
                .iter()
                .position(|user| user.room_id == *own_room)
                .ok_or(Error::UserNotEntered)?;
            let exited = active.participants.remove(pos);
            let ended = active.started && active.participants.len() < 2;
            let rooms: Vec<RoomId> = active
                .participants
                .iter()
                .map(|user| user.room_id.clone())
                .collect();
            (exited, rooms, ended)
        };

        let exited_for_event = exited;
        let battle_id_for_event = battle_id.clone();
        for room in &remaining_rooms {
            let exited = exited_for_event.clone();
            let battle_id = battle_id_for_event.clone();
            self.notify_room(room, move |observer| {
                observer.on_user_exit_battle(&battle_id, &exited);
            });
        }

        if ended {
            self.end_battle(battle_id, BattleStoppedReason::OtherExit);
        }
        Ok(())
    }

    /// Record a room's score (driven by the hosting application) and fan
    /// out the updated scoreboard
    pub fn update_battle_score(&self, battle_id: &BattleId, room_id: &RoomId, score: u64) -> Result<()> {
        let battle = self
            .battles
            .get(battle_id)
            .map(|battle| battle.clone())
            .ok_or(Error::RequestIdInvalid)?;

        let (scoreboard, rooms) = {
            let mut active = battle.write();
            let user = active
                .participants
                .iter_mut()
                .find(|user| user.room_id == *room_id)
                .ok_or(Error::UserNotEntered)?;
            user.score = score;
            let rooms: Vec<RoomId> = active
                .participants
                .iter()
                .map(|user| user.room_id.clone())
                .collect();
            (active.participants.clone(), rooms)
        };

        for room in &rooms {
            let battle_id = battle_id.clone();
            let scoreboard = scoreboard.clone();
            self.notify_room(room, move |observer| {
                observer.on_battle_score_changed(&battle_id, &scoreboard);
            });
        }
        Ok(())
    }

    /// Battle a room currently participates in
    pub fn battle_of_room(&self, room_id: &RoomId) -> Option<BattleId> {
        self.battles.iter().find_map(|entry| {
            let active = entry.value().read();
            active
                .participants
                .iter()
                .any(|user| user.room_id == *room_id)
                .then(|| entry.key().clone())
        })
    }

    pub fn battle_info(&self, battle_id: &BattleId) -> Option<BattleInfo> {
        self.battles.get(battle_id).map(|battle| {
            let active = battle.read();
            let mut info = active.info.clone();
            info.invitee_list = active
                .participants
                .iter()
                .filter(|user| user.room_id != info.inviter.room_id)
                .cloned()
                .collect();
            info
        })
    }

    fn join_battle(&self, battle_id: &BattleId, user: BattleUser) {
        let Some(battle) = self.battles.get(battle_id).map(|battle| battle.clone()) else {
            return;
        };
        let rooms = {
            let mut active = battle.write();
            if active
                .participants
                .iter()
                .any(|existing| existing.room_id == user.room_id)
            {
                return;
            }
            active.participants.push(user.clone());
            active
                .participants
                .iter()
                .map(|participant| participant.room_id.clone())
                .collect::<Vec<_>>()
        };

        for room in &rooms {
            let battle_id = battle_id.clone();
            let user = user.clone();
            self.notify_room(room, move |observer| {
                observer.on_user_join_battle(&battle_id, &user);
            });
        }
    }

    /// Mark the battle started (idempotent) and arm the duration
    /// supervisor
    fn start_battle(&self, battle_id: &BattleId) {
        let Some(battle) = self.battles.get(battle_id).map(|battle| battle.clone()) else {
            return;
        };
        let (info, rooms, duration) = {
            let mut active = battle.write();
            if active.started || active.participants.len() < 2 {
                return;
            }
            active.started = true;
            active.info.start_time = Some(chrono::Utc::now());
            let rooms: Vec<RoomId> = active
                .participants
                .iter()
                .map(|user| user.room_id.clone())
                .collect();
            (
                active.info.clone(),
                rooms,
                Duration::from_secs(active.info.config.duration_secs),
            )
        };

        for room in &rooms {
            let info = info.clone();
            self.notify_room(room, move |observer| {
                observer.on_battle_started(&info);
            });
        }

        if !duration.is_zero() {
            let service = self.clone();
            let battle_id = battle_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                service.end_battle(&battle_id, BattleStoppedReason::TimeOver);
            });
        }
        tracing::info!(battle_id = %battle_id, "battle started");
    }

    /// Drop a never-started battle once no invitation can still arrive
    fn end_battle_if_abandoned(&self, battle_id: &BattleId) {
        let abandoned = self.battles.get(battle_id).is_some_and(|battle| {
            let active = battle.read();
            !active.started
                && active.participants.len() < 2
                && !self
                    .pending
                    .iter()
                    .any(|entry| entry.key().0 == *battle_id)
        });
        if abandoned {
            self.battles.remove(battle_id);
        }
    }

    /// End a battle exactly once and notify every participant room
    fn end_battle(&self, battle_id: &BattleId, reason: BattleStoppedReason) {
        let Some((_, battle)) = self.battles.remove(battle_id) else {
            return;
        };
        let (info, rooms) = {
            let mut active = battle.write();
            active.info.end_time = Some(chrono::Utc::now());
            let rooms: Vec<RoomId> = active
                .participants
                .iter()
                .map(|user| user.room_id.clone())
                .collect();
            (active.info.clone(), rooms)
        };

        for room in &rooms {
            let info = info.clone();
            self.notify_room(room, move |observer| {
                observer.on_battle_ended(&info, reason);
            });
        }
        tracing::info!(battle_id = %battle_id, ?reason, "battle ended");
    }

    fn classify_target(&self, target: &RoomId) -> BattleCode {
        if !self.store.contains(target) {
            return BattleCode::RoomNotExist;
        }
        let is_live = self
            .store
            .read_room(target, |state| Ok(state.info.room_type == RoomType::Live))
            .unwrap_or(false);
        if !is_live {
            return BattleCode::RoomNotExist;
        }
        if self.battle_of_room(target).is_some() {
            return BattleCode::BattlingOtherRoom;
        }
        if self.pending.iter().any(|entry| entry.key().1 == *target) {
            return BattleCode::Battling;
        }
        BattleCode::Success
    }

    fn on_request_timed_out(&self, tracked: &super::request::TrackedRequest<BattleSignal>) {
        let signal = tracked.payload.clone();
        self.pending
            .remove(&(signal.battle_id.clone(), signal.invitee.room_id.clone()));

        if let Some(info) = self.battle_info(&signal.battle_id) {
            for room in [&signal.inviter.room_id, &signal.invitee.room_id] {
                let info = info.clone();
                let inviter = signal.inviter.clone();
                let invitee = signal.invitee.clone();
                self.notify_room(room, move |observer| {
                    observer.on_battle_request_timeout(&info, &inviter, &invitee);
                });
            }
        }
        self.end_battle_if_abandoned(&signal.battle_id);
    }

    /// Build the battle identity of a room, verifying the caller owns it
    /// and the room is a live room
    fn room_battle_user(&self, room_id: &RoomId, caller: &UserId) -> Result<BattleUser> {
        self.store.read_room(room_id, |state| {
            if state.info.room_type != RoomType::Live {
                return Err(Error::OperationNotSupportedInCurrentRoomType);
            }
            let owner = state.require_owner(caller)?;
            Ok(BattleUser::new(
                room_id.clone(),
                owner.user_id.clone(),
                owner.user_name.clone(),
            ))
        })
    }

    fn notify_room(&self, room_id: &RoomId, deliver: impl Fn(&(dyn BattleObserver + 'static))) {
        let members = self
            .store
            .read_room(room_id, |state| Ok(state.member_ids()))
            .unwrap_or_default();
        self.observers.notify_users(members.iter(), deliver);
    }
}
