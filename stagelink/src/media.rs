//! Media engine seam
//!
//! The actual capture/encode/transport/render pipeline lives behind this
//! trait; the contract layer calls it and surfaces results
//! asynchronously. [`NullMedia`] ships for tests and headless use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stagelink_core::models::UserId;
use stagelink_core::Result;

/// Capture/encode quality of the local camera stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum VideoQuality {
    Quality360P,
    Quality540P,
    #[default]
    Quality720P,
    Quality1080P,
}

/// Capture quality of the local microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum AudioQuality {
    Speech,
    #[default]
    Default,
    Music,
}

/// Which remote stream to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum VideoStreamType {
    #[default]
    CameraStream,
    ScreenStream,
    CameraStreamLow,
}

/// Opaque media pipeline collaborator
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn open_local_camera(&self, is_front: bool, quality: VideoQuality) -> Result<()>;

    async fn close_local_camera(&self);

    async fn open_local_microphone(&self, quality: AudioQuality) -> Result<()>;

    async fn close_local_microphone(&self);

    async fn start_screen_capture(&self) -> Result<()>;

    async fn stop_screen_capture(&self);

    /// Mute without stopping capture
    async fn mute_local_audio(&self, mute: bool);

    async fn start_play_remote_video(
        &self,
        user_id: &UserId,
        stream_type: VideoStreamType,
    ) -> Result<()>;

    async fn stop_play_remote_video(&self, user_id: &UserId, stream_type: VideoStreamType);
}

/// Media engine that does nothing
#[derive(Debug, Default)]
pub struct NullMedia;

#[async_trait]
impl MediaEngine for NullMedia {
    async fn open_local_camera(&self, _is_front: bool, _quality: VideoQuality) -> Result<()> {
        Ok(())
    }

    async fn close_local_camera(&self) {}

    async fn open_local_microphone(&self, _quality: AudioQuality) -> Result<()> {
        Ok(())
    }

    async fn close_local_microphone(&self) {}

    async fn start_screen_capture(&self) -> Result<()> {
        Ok(())
    }

    async fn stop_screen_capture(&self) {}

    async fn mute_local_audio(&self, _mute: bool) {}

    async fn start_play_remote_video(
        &self,
        _user_id: &UserId,
        _stream_type: VideoStreamType,
    ) -> Result<()> {
        Ok(())
    }

    async fn stop_play_remote_video(&self, _user_id: &UserId, _stream_type: VideoStreamType) {}
}
