//! Callbacks into the host application

use crate::error::DetachReason;

/// Notifications a surface sends to its host
///
/// Shared with the jog reset task, hence `Send + Sync`.
pub trait SurfaceHost: Send + Sync {
    fn key_down(&self, control_id: &str);

    fn key_up(&self, control_id: &str);

    fn push_channel_value(&self, channel: &str, value: i32);

    /// The panel is gone; the host should drop the surface
    fn detach(&self, reason: DetachReason);
}
