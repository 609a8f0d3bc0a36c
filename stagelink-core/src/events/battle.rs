//! Battle event surface

use crate::models::{BattleId, BattleInfo, BattleStoppedReason, BattleUser};

/// Observer for battle events between connected live rooms.
///
/// Every handler has a no-op default.
#[allow(unused_variables)]
pub trait BattleObserver: Send + Sync {
    fn on_battle_started(&self, battle_info: &BattleInfo) {}

    fn on_battle_ended(&self, battle_info: &BattleInfo, reason: BattleStoppedReason) {}

    fn on_user_join_battle(&self, battle_id: &BattleId, battle_user: &BattleUser) {}

    fn on_user_exit_battle(&self, battle_id: &BattleId, battle_user: &BattleUser) {}

    fn on_battle_score_changed(&self, battle_id: &BattleId, battle_user_list: &[BattleUser]) {}

    fn on_battle_request_received(
        &self,
        battle_info: &BattleInfo,
        inviter: &BattleUser,
        invitee: &BattleUser,
    ) {
    }

    fn on_battle_request_cancelled(
        &self,
        battle_info: &BattleInfo,
        inviter: &BattleUser,
        invitee: &BattleUser,
    ) {
    }

    fn on_battle_request_timeout(
        &self,
        battle_info: &BattleInfo,
        inviter: &BattleUser,
        invitee: &BattleUser,
    ) {
    }

    fn on_battle_request_accept(
        &self,
        battle_info: &BattleInfo,
        inviter: &BattleUser,
        invitee: &BattleUser,
    ) {
    }

    fn on_battle_request_reject(
        &self,
        battle_info: &BattleInfo,
        inviter: &BattleUser,
        invitee: &BattleUser,
    ) {
    }
}
