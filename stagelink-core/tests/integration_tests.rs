//! Service-level integration tests
//!
//! Drive the wired [`Services`] aggregate directly, the way the engine
//! facade does, and check the cross-service invariants.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use stagelink_core::config::Config;
use stagelink_core::error::Error;
use stagelink_core::events::{DuplicatePolicy, RoomObserver};
use stagelink_core::models::{
    EnterRoomOptions, LoginUserInfo, RequestOutcome, RoomId, RoomInfo, RoomType, SeatInfo,
    SeatMode, UserId,
};
use stagelink_core::service::{AcceptAnySig, Services};

#[derive(Default)]
struct SeatWatcher {
    events: Mutex<Vec<(Vec<SeatInfo>, Vec<SeatInfo>)>>,
}

impl RoomObserver for SeatWatcher {
    fn on_seat_list_changed(&self, _seat_list: &[SeatInfo], seated: &[SeatInfo], left: &[SeatInfo]) {
        self.events.lock().push((seated.to_vec(), left.to_vec()));
    }
}

fn profile(id: &str) -> LoginUserInfo {
    LoginUserInfo {
        user_id: UserId::from(id),
        user_name: id.to_string(),
        avatar_url: String::new(),
    }
}

fn services() -> Services {
    Services::new(&Config::default(), Arc::new(AcceptAnySig))
}

fn seat_conference(services: &Services, owner: &LoginUserInfo, mode: SeatMode) -> RoomId {
    let room_id = RoomId::from("conf");
    let mut info = RoomInfo::new(room_id.clone(), RoomType::Conference);
    info.is_seat_enabled = true;
    info.seat_mode = mode;
    info.max_seat_count = 4;
    services.rooms.create_room(owner, info).unwrap();
    services
        .rooms
        .enter_room(owner, &room_id, RoomType::Conference, &EnterRoomOptions::default())
        .unwrap();
    room_id
}

#[tokio::test]
async fn test_seat_application_lifecycle_across_services() {
    let services = services();
    let owner = profile("owner");
    let alice = profile("alice");
    let room_id = seat_conference(&services, &owner, SeatMode::ApplyToTake);
    services
        .rooms
        .enter_room(&alice, &room_id, RoomType::Conference, &EnterRoomOptions::default())
        .unwrap();

    let watcher = Arc::new(SeatWatcher::default());
    services
        .room_observers
        .add_observer(&alice.user_id, watcher.clone());

    let handle = services
        .seats
        .take_seat(&alice.user_id, &room_id, Some(2), Duration::from_secs(30))
        .unwrap();
    services
        .seats
        .respond_request(&owner.user_id, handle.request_id(), true)
        .unwrap();

    assert!(matches!(
        handle.outcome().await,
        RequestOutcome::Accepted { .. }
    ));
    let events = watcher.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0[0].index, 2);

    // The seat survives a room info fetch
    let info = services.rooms.fetch_room_info(&room_id).unwrap();
    assert_eq!(info.member_count, 2);
}

#[tokio::test]
async fn test_member_exit_vacates_seat_with_delta() {
    let services = services();
    let owner = profile("owner");
    let alice = profile("alice");
    let room_id = seat_conference(&services, &owner, SeatMode::FreeToTake);
    services
        .rooms
        .enter_room(&alice, &room_id, RoomType::Conference, &EnterRoomOptions::default())
        .unwrap();
    services
        .seats
        .take_seat(&alice.user_id, &room_id, Some(1), Duration::ZERO)
        .unwrap();

    let watcher = Arc::new(SeatWatcher::default());
    services
        .room_observers
        .add_observer(&owner.user_id, watcher.clone());

    services.rooms.exit_room(&alice.user_id, &room_id).unwrap();

    // The departing member's seat came back as a `left` delta
    let events = watcher.events.lock();
    assert_eq!(events.len(), 1);
    let (seated, left) = &events[0];
    assert!(seated.is_empty());
    assert_eq!(left[0].index, 1);
    assert_eq!(left[0].user_id, Some(alice.user_id.clone()));
}

#[tokio::test]
async fn test_dedupe_policy_applies_to_every_surface() {
    let mut config = Config::default();
    config.observer.duplicate_policy = DuplicatePolicy::Dedupe;
    let services = Services::new(&config, Arc::new(AcceptAnySig));
    let owner = profile("owner");
    let room_id = seat_conference(&services, &owner, SeatMode::FreeToTake);

    let watcher = Arc::new(SeatWatcher::default());
    services
        .room_observers
        .add_observer(&owner.user_id, watcher.clone());
    services
        .room_observers
        .add_observer(&owner.user_id, watcher.clone());

    services
        .seats
        .take_seat(&owner.user_id, &room_id, Some(0), Duration::ZERO)
        .unwrap();

    // Deduped: one delivery despite the double registration
    assert_eq!(watcher.events.lock().len(), 1);
}

#[tokio::test]
async fn test_session_login_gates_profile_directory() {
    let services = services();
    let user = UserId::from("alice");

    assert_eq!(
        services.sessions.get_self_info(&user).unwrap_err(),
        Error::SdkNotInitialized
    );
    services.sessions.login(1, user.clone(), "sig").await.unwrap();
    assert_eq!(services.sessions.get_self_info(&user).unwrap().user_name, "alice");
}
