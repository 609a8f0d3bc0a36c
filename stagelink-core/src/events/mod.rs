//! Event fan-out
//!
//! Each event surface (room, connection, battle, invitation) owns one
//! [`ObserverRegistry`]; state changes are pushed synchronously to every
//! registered observer. Observers are capability-set traits: every event
//! has a default no-op handler, subscribers override only what they need.

pub mod battle;
pub mod connection;
pub mod hub;
pub mod invitation;
pub mod registry;
pub mod room;

pub use battle::BattleObserver;
pub use connection::ConnectionObserver;
pub use hub::ObserverHub;
pub use invitation::InvitationObserver;
pub use registry::{DuplicatePolicy, ObserverRegistry};
pub use room::RoomObserver;
