pub mod battle;
pub mod connection;
pub mod invitation;
pub mod request;
pub mod room;
pub mod seat;
pub mod session;
pub mod store;

pub use battle::{BattleService, BattleSignal};
pub use connection::{ConnectionService, ConnectionSignal};
pub use invitation::{InvitationService, InvitationSignal};
pub use request::{RequestHandle, RequestTracker, TrackedRequest};
pub use room::RoomService;
pub use seat::{RoomRequestHandle, RoomSignal, SeatService};
pub use session::{AcceptAnySig, Authenticator, SessionService};
pub use store::{RoomStore, RoomState};

use std::sync::Arc;

use crate::config::Config;
use crate::events::{BattleObserver, ConnectionObserver, InvitationObserver, ObserverHub, RoomObserver};

/// One deployment's services, shared by every engine handle bound to it
#[derive(Clone, Debug)]
pub struct Services {
    pub sessions: SessionService,
    pub rooms: RoomService,
    pub seats: SeatService,
    pub invitations: InvitationService,
    pub connections: ConnectionService,
    pub battles: BattleService,

    pub room_observers: Arc<ObserverHub<dyn RoomObserver>>,
    pub invitation_observers: Arc<ObserverHub<dyn InvitationObserver>>,
    pub connection_observers: Arc<ObserverHub<dyn ConnectionObserver>>,
    pub battle_observers: Arc<ObserverHub<dyn BattleObserver>>,
}

impl Services {
    /// Wire every service onto one shared room store
    pub fn new(config: &Config, authenticator: Arc<dyn Authenticator>) -> Self {
        let store = Arc::new(RoomStore::new());
        let policy = config.observer.duplicate_policy;

        let room_observers = Arc::new(ObserverHub::new(policy));
        let invitation_observers = Arc::new(ObserverHub::new(policy));
        let connection_observers = Arc::new(ObserverHub::new(policy));
        let battle_observers = Arc::new(ObserverHub::new(policy));

        let sessions = SessionService::new(authenticator);
        let rooms = RoomService::new(store.clone(), room_observers.clone(), config.room.clone());
        let seats = SeatService::new(store.clone(), room_observers.clone());
        let invitations =
            InvitationService::new(store.clone(), sessions.clone(), invitation_observers.clone());
        let connections = ConnectionService::new(
            store.clone(),
            connection_observers.clone(),
            config.room.clone(),
        );
        let battles = BattleService::new(store, battle_observers.clone());

        Self {
            sessions,
            rooms,
            seats,
            invitations,
            connections,
            battles,
            room_observers,
            invitation_observers,
            connection_observers,
            battle_observers,
        }
    }
}
