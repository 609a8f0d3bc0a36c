//! StageLink room engine
//!
//! Client-facing session and signaling layer for real-time audio/video
//! rooms: room lifecycle, seat coordination, tracked signaling requests
//! (seat applications, device requests, invitations, connections,
//! battles), and observer fan-out. Media capture, encoding, and
//! transport stay behind the [`MediaEngine`] seam.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagelink::prelude::*;
//!
//! # async fn run() -> stagelink::Result<()> {
//! let engine = RoomEngine::builder().build();
//! engine.login(1_400_000_001, "alice".into(), "sig").await?;
//!
//! let mut info = RoomInfo::new("room-1".into(), RoomType::Conference);
//! info.is_seat_enabled = true;
//! engine.create_room(info).await?;
//! engine
//!     .enter_room("room-1".into(), RoomType::Conference, EnterRoomOptions::default())
//!     .await?;
//! let handle = engine.take_seat(None, 30).await?;
//! handle.outcome().await;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod media;
pub mod prelude;

pub use engine::{RoomEngine, RoomEngineBuilder};
pub use media::{AudioQuality, MediaEngine, NullMedia, VideoQuality, VideoStreamType};

pub use stagelink_core::{config, error, events, models, service};
pub use stagelink_core::{Config, Error, Result};
