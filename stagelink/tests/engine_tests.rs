//! Multi-party engine tests
//!
//! Several engine handles share one deployment; each test drives a small
//! room scenario and asserts both the returned state and the events each
//! participant observed.

use mockall::mock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use stagelink::prelude::*;

mock! {
    Auth {}

    #[async_trait::async_trait]
    impl Authenticator for Auth {
        async fn authenticate(&self, sdk_app_id: u32, user_id: &UserId, user_sig: &str)
            -> Result<()>;
    }
}

/// Room observer recording the events a participant saw
#[derive(Default)]
struct Recorder {
    seat_events: Mutex<Vec<(Vec<SeatInfo>, Vec<SeatInfo>, Vec<SeatInfo>)>>,
    dismissed: Mutex<Vec<(RoomId, DismissedReason)>>,
    kicked_out: Mutex<Vec<(RoomId, KickedOutReason)>>,
    requests: Mutex<Vec<Request>>,
    messages: Mutex<Vec<TextMessage>>,
}

impl RoomObserver for Recorder {
    fn on_seat_list_changed(&self, seat_list: &[SeatInfo], seated: &[SeatInfo], left: &[SeatInfo]) {
        self.seat_events
            .lock()
            .push((seat_list.to_vec(), seated.to_vec(), left.to_vec()));
    }

    fn on_room_dismissed(&self, room_id: &RoomId, reason: DismissedReason) {
        self.dismissed.lock().push((room_id.clone(), reason));
    }

    fn on_kicked_out_of_room(&self, room_id: &RoomId, reason: KickedOutReason, _message: &str) {
        self.kicked_out.lock().push((room_id.clone(), reason));
    }

    fn on_request_received(&self, request: &Request) {
        self.requests.lock().push(request.clone());
    }

    fn on_receive_text_message(&self, message: &TextMessage) {
        self.messages.lock().push(message.clone());
    }
}

/// Battle observer counting terminal events
#[derive(Default)]
struct BattleRecorder {
    ended: Mutex<Vec<BattleStoppedReason>>,
}

impl BattleObserver for BattleRecorder {
    fn on_battle_ended(&self, _battle_info: &BattleInfo, reason: BattleStoppedReason) {
        self.ended.lock().push(reason);
    }
}

async fn engine_for(services: &Services, id: &str) -> RoomEngine {
    let engine = RoomEngine::builder().services(services.clone()).build();
    engine.login(1_400_000_001, id.into(), "sig").await.unwrap();
    engine
}

/// Conference with seat control, owner entered
async fn seat_room(seat_mode: SeatMode) -> (RoomEngine, Services, RoomId) {
    let owner = RoomEngine::builder().build();
    let services = owner.services();
    owner.login(1_400_000_001, "owner".into(), "sig").await.unwrap();

    let room_id = RoomId::from("room-1");
    let mut info = RoomInfo::new(room_id.clone(), RoomType::Conference);
    info.is_seat_enabled = true;
    info.seat_mode = seat_mode;
    info.max_seat_count = 4;
    owner.create_room(info).await.unwrap();
    owner
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();
    (owner, services, room_id)
}

#[tokio::test]
async fn test_apply_to_take_accept_flow() {
    let (owner, services, room_id) = seat_room(SeatMode::ApplyToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    let owner_recorder = Arc::new(Recorder::default());
    let as_observer: Arc<dyn RoomObserver> = owner_recorder.clone();
    owner.add_observer(as_observer).unwrap();

    let handle = alice.take_seat(Some(3), 30).await.unwrap();
    let request_id = handle.request_id().clone();

    // The admin saw the application arrive
    assert_eq!(owner_recorder.requests.lock().len(), 1);
    assert_eq!(
        owner_recorder.requests.lock()[0].action,
        RequestAction::TakeSeat
    );

    owner.respond_remote_request(&request_id, true).await.unwrap();
    assert_eq!(
        handle.outcome().await,
        RequestOutcome::Accepted {
            user_id: "owner".into()
        }
    );

    // Seat 3 holds alice now
    let seats = alice.get_seat_list().await.unwrap();
    assert_eq!(seats[3].user_id, Some(UserId::from("alice")));

    // Exactly one seat event, carrying seated=[3]
    let events = owner_recorder.seat_events.lock();
    assert_eq!(events.len(), 1);
    let (_, seated, left) = &events[0];
    assert_eq!(seated.len(), 1);
    assert_eq!(seated[0].index, 3);
    assert!(left.is_empty());
}

#[tokio::test]
async fn test_take_seat_auto_pick_when_full() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let mut members = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let engine = engine_for(&services, name).await;
        engine
            .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
            .await
            .unwrap();
        engine.take_seat(None, 0).await.unwrap();
        members.push(engine);
    }

    let late = engine_for(&services, "late").await;
    late.enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();
    assert_eq!(
        late.take_seat(None, 30).await.unwrap_err(),
        Error::AllSeatOccupied
    );

    // No request was created for the failed take
    assert!(owner.get_seat_application_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_destroy_room_notifies_all_members() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;

    let mut guests = Vec::new();
    for name in ["g1", "g2", "g3", "g4", "g5"] {
        let engine = engine_for(&services, name).await;
        engine
            .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
            .await
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        engine.add_observer(recorder.clone()).unwrap();
        guests.push((engine, recorder));
    }

    owner.destroy_room().await.unwrap();

    for (engine, recorder) in &guests {
        let dismissed = recorder.dismissed.lock();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0], (room_id.clone(), DismissedReason::ByOwner));
        drop(dismissed);

        // Any later operation against the dead room fails
        assert_eq!(
            engine.get_user_list().await.unwrap_err(),
            Error::RoomIdNotExist
        );
    }
}

#[tokio::test]
async fn test_remove_unregistered_observer_is_harmless() {
    let (owner, _services, _room_id) = seat_room(SeatMode::FreeToTake).await;

    let registered = Arc::new(Recorder::default());
    owner
        .add_observer(registered.clone())
        .unwrap();

    let stranger: Arc<dyn RoomObserver> = Arc::new(Recorder::default());
    owner.remove_observer(&stranger).unwrap();

    // Delivery to the registered observer is unaffected
    owner.take_seat(Some(0), 0).await.unwrap();
    assert_eq!(registered.seat_events.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_never_expires() {
    let (owner, services, room_id) = seat_room(SeatMode::ApplyToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    let handle = alice.take_seat(Some(1), 0).await.unwrap();
    let request_id = handle.request_id().clone();

    tokio::time::sleep(std::time::Duration::from_secs(7 * 24 * 3600)).await;

    // Still pending after a week; the admin can still accept
    owner.respond_remote_request(&request_id, true).await.unwrap();
    assert!(matches!(
        handle.outcome().await,
        RequestOutcome::Accepted { .. }
    ));
}

#[tokio::test]
async fn test_exactly_one_terminal_transition() {
    let (owner, services, room_id) = seat_room(SeatMode::ApplyToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    let handle = alice.take_seat(Some(1), 30).await.unwrap();
    let request_id = handle.request_id().clone();

    owner.respond_remote_request(&request_id, true).await.unwrap();

    // Every later transition attempt observes the terminal state
    assert_eq!(
        alice.cancel_request(&request_id).await.unwrap_err(),
        Error::RequestIdInvalid
    );
    assert_eq!(
        owner
            .respond_remote_request(&request_id, false)
            .await
            .unwrap_err(),
        Error::RequestIdRepeat
    );
}

#[tokio::test]
async fn test_swap_emits_single_event_with_both_deltas() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let alice = engine_for(&services, "alice").await;
    let bob = engine_for(&services, "bob").await;
    for engine in [&alice, &bob] {
        engine
            .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
            .await
            .unwrap();
    }
    alice.take_seat(Some(0), 0).await.unwrap();
    bob.take_seat(Some(3), 0).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    owner.add_observer(recorder.clone()).unwrap();

    owner
        .move_user_to_seat_by_admin(&"alice".into(), 3, MoveSeatPolicy::SwapPosition)
        .await
        .unwrap();

    let seats = owner.get_seat_list().await.unwrap();
    assert_eq!(seats[3].user_id, Some(UserId::from("alice")));
    assert_eq!(seats[0].user_id, Some(UserId::from("bob")));

    // One notification carrying both position changes
    let events = recorder.seat_events.lock();
    assert_eq!(events.len(), 1);
    let (_, seated, _) = &events[0];
    let mut indices: Vec<usize> = seated.iter().map(|seat| seat.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 3]);
}

#[tokio::test]
async fn test_second_conference_evicts_first() {
    let owner = RoomEngine::builder().build();
    let services = owner.services();
    owner.login(1, "owner".into(), "sig").await.unwrap();
    for id in ["c1", "c2"] {
        owner
            .create_room(RoomInfo::new(id.into(), RoomType::Conference))
            .await
            .unwrap();
    }

    let alice = engine_for(&services, "alice").await;
    let recorder = Arc::new(Recorder::default());
    alice
        .enter_room("c1".into(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();
    alice.add_observer(recorder.clone()).unwrap();
    alice
        .enter_room("c2".into(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    let kicked = recorder.kicked_out.lock();
    assert_eq!(kicked.len(), 1);
    assert_eq!(
        kicked[0],
        (
            RoomId::from("c1"),
            KickedOutReason::JoinedRoomCountExceedLimit
        )
    );
}

#[tokio::test]
async fn test_room_wide_mute_blocks_guests_only() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    owner.disable_sending_message_for_all_user(true).await.unwrap();
    assert_eq!(
        alice
            .send_text_message("hello", HashMap::new())
            .await
            .unwrap_err(),
        Error::SendMessageDisabledForAll
    );
    owner.send_text_message("announcement", HashMap::new()).await.unwrap();
}

#[tokio::test]
async fn test_message_delivery_to_other_members() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    let alice_recorder = Arc::new(Recorder::default());
    alice
        .add_observer(alice_recorder.clone())
        .unwrap();

    let sent = owner.send_text_message("hi room", HashMap::new()).await.unwrap();
    let received = alice_recorder.messages.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].text_content, "hi room");
    assert_eq!(received[0].sequence, sent.sequence);
}

#[tokio::test]
async fn test_invalid_license_latches_until_relogin() {
    let mut auth = MockAuth::new();
    auth.expect_authenticate()
        .returning(|_, _, _| Err(Error::InvalidLicense));
    let engine = RoomEngine::builder().authenticator(Arc::new(auth)).build();

    assert_eq!(
        engine.login(1, "alice".into(), "sig").await.unwrap_err(),
        Error::InvalidLicense
    );

    // Every subsequent operation short-circuits with the latched error
    assert_eq!(engine.get_self_info().unwrap_err(), Error::InvalidLicense);
    assert_eq!(
        engine
            .create_room(RoomInfo::new("r".into(), RoomType::Conference))
            .await
            .unwrap_err(),
        Error::InvalidLicense
    );
    assert_eq!(
        engine.send_text_message("hi", HashMap::new()).await.unwrap_err(),
        Error::InvalidLicense
    );
}

#[tokio::test]
async fn test_logout_requires_relogin() {
    let engine = RoomEngine::builder().build();
    engine.login(1, "alice".into(), "sig").await.unwrap();
    engine.logout().await.unwrap();

    assert_eq!(
        engine.get_self_info().unwrap_err(),
        Error::SdkNotInitialized
    );
    assert_eq!(
        engine
            .create_room(RoomInfo::new("r".into(), RoomType::Conference))
            .await
            .unwrap_err(),
        Error::SdkNotInitialized
    );

    engine.login(1, "alice".into(), "sig").await.unwrap();
    assert!(engine.get_self_info().is_ok());
}

#[tokio::test]
async fn test_owner_logout_destroys_room() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    alice.add_observer(recorder.clone()).unwrap();

    owner.logout().await.unwrap();

    assert_eq!(recorder.dismissed.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_battle_time_over_fires_once() {
    let host_a = RoomEngine::builder().build();
    let services = host_a.services();
    host_a.login(1, "host-a".into(), "sig").await.unwrap();
    let host_b = engine_for(&services, "host-b").await;

    for (engine, room) in [(&host_a, "live-a"), (&host_b, "live-b")] {
        engine
            .create_room(RoomInfo::new(room.into(), RoomType::Live))
            .await
            .unwrap();
        engine
            .enter_room(room.into(), RoomType::Live, EnterRoomOptions::default())
            .await
            .unwrap();
    }

    let recorder = Arc::new(BattleRecorder::default());
    host_b
        .add_battle_observer(recorder.clone())
        .unwrap();

    let config = BattleConfig {
        duration_secs: 120,
        need_response: false,
        extension_info: String::new(),
    };
    host_a
        .request_battle(config, &[RoomId::from("live-b")], 0)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(121)).await;
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_secs(300)).await;
    tokio::task::yield_now().await;

    let ended = recorder.ended.lock();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0], BattleStoppedReason::TimeOver);
}

#[tokio::test]
async fn test_invitation_flow_between_engines() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let guest = engine_for(&services, "guest").await;

    let results = owner.invite_users(&["guest".into()], 60, "join us").await.unwrap();
    assert_eq!(
        results.get(&UserId::from("guest")),
        Some(&InvitationCode::Success)
    );

    guest.accept_invitation(&room_id).await.unwrap();
    guest
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();
    assert_eq!(owner.get_user_list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_connection_flow_between_engines() {
    let host_a = RoomEngine::builder().build();
    let services = host_a.services();
    host_a.login(1, "host-a".into(), "sig").await.unwrap();
    let host_b = engine_for(&services, "host-b").await;

    for (engine, room) in [(&host_a, "live-a"), (&host_b, "live-b")] {
        engine
            .create_room(RoomInfo::new(room.into(), RoomType::Live))
            .await
            .unwrap();
        engine
            .enter_room(room.into(), RoomType::Live, EnterRoomOptions::default())
            .await
            .unwrap();
    }

    let results = host_a
        .request_connection(&[RoomId::from("live-b")], 30, "")
        .await
        .unwrap();
    assert_eq!(
        results.get(&RoomId::from("live-b")),
        Some(&ConnectionCode::Success)
    );
    host_b.accept_connection(&RoomId::from("live-a")).await.unwrap();
    host_a.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_device_open_honors_room_wide_disable() {
    let (owner, services, room_id) = seat_room(SeatMode::FreeToTake).await;
    let alice = engine_for(&services, "alice").await;
    alice
        .enter_room(room_id.clone(), RoomType::Conference, EnterRoomOptions::default())
        .await
        .unwrap();

    owner
        .disable_device_for_all_user_by_admin(MediaDevice::Camera, true)
        .await
        .unwrap();
    assert!(matches!(
        alice
            .open_local_camera(true, VideoQuality::Quality720P)
            .await
            .unwrap_err(),
        Error::PermissionDenied(_)
    ));

    // The escalation path still works: apply, admin approves
    let handle = alice
        .apply_to_admin_to_open_local_device(MediaDevice::Camera, 30)
        .await
        .unwrap();
    owner
        .respond_remote_request(handle.request_id(), true)
        .await
        .unwrap();
    let user = owner.get_user_info(&"alice".into()).await.unwrap();
    assert!(user.has_video_stream);
}
