//! Boundary with the panel transport
//!
//! The HID layer is not part of this crate. It hands the surface a
//! [`PanelHardware`] for output and an [`EventSubscription`] for input.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::buttons::{ButtonMetadata, DeviceIndex, LogicalPosition};
use crate::display::color::{ButtonColor, RgbColor};
use crate::error::HardwareError;

/// Indicator LED lit while any key is held
pub const PRESS_INDICATOR_LED: u8 = 1;

/// Backlight forced onto a held key when pressed illumination is on
pub const PRESSED_ALERT_COLOR: RgbColor = RgbColor::RED;

/// Intensity of the pressed channel when pressed illumination is on
pub const FULL_INTENSITY: u8 = 255;

/// Delay before a jog pulse is returned to zero
pub const JOG_RESET_DELAY: Duration = Duration::from_millis(20);

/// Static description of an attached panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelInfo {
    /// Model name, for display only
    pub name: String,
    pub row_count: u32,
    pub col_count: u32,
    #[serde(default)]
    pub has_jog: bool,
    #[serde(default)]
    pub has_shuttle: bool,
    #[serde(default)]
    pub has_joystick: bool,
    #[serde(default)]
    pub has_tbar: bool,
}

impl PanelInfo {
    pub fn button_count(&self) -> u32 {
        self.row_count * self.col_count
    }

    pub fn contains(&self, pos: LogicalPosition) -> bool {
        pos.row < self.row_count && pos.column < self.col_count
    }

    /// Native index of an in-bounds position
    pub fn device_index(&self, pos: LogicalPosition) -> Option<DeviceIndex> {
        self.contains(pos)
            .then(|| pos.to_device_index(self.row_count))
    }

    /// All native key indices, in device order
    pub fn device_indices(&self) -> impl Iterator<Item = DeviceIndex> {
        (1..=self.button_count()).map(DeviceIndex)
    }
}

/// Output side of the panel transport
///
/// Writes are synchronous and best-effort; callers decide whether a failure
/// matters.
pub trait PanelHardware {
    fn info(&self) -> &PanelInfo;

    fn set_backlight(&mut self, index: DeviceIndex, color: ButtonColor)
        -> Result<(), HardwareError>;

    /// Intensity for unpressed and pressed keys (0-255 each)
    fn set_backlight_intensity(&mut self, unpressed: u8, pressed: u8)
        -> Result<(), HardwareError>;

    fn set_indicator_led(&mut self, led: u8, on: bool) -> Result<(), HardwareError>;

    /// Release the transport handle
    fn close(&mut self) -> Result<(), HardwareError>;
}

/// Joystick reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Input events from the panel
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    ButtonDown {
        index: DeviceIndex,
        metadata: ButtonMetadata,
    },
    ButtonUp {
        index: DeviceIndex,
        metadata: ButtonMetadata,
    },
    /// Relative rotation since the last report
    Jog { control: u8, delta: i32 },
    /// Absolute shuttle ring position, -7..=7
    Shuttle { control: u8, position: i32 },
    Joystick {
        control: u8,
        position: JoystickPosition,
    },
    /// Absolute T-bar position, 0..=255
    Tbar { control: u8, position: i32 },
    Error(String),
    Disconnected,
}

/// Transport side of the event channel
#[derive(Debug, Clone)]
pub struct PanelEventSender {
    tx: mpsc::UnboundedSender<PanelEvent>,
}

impl PanelEventSender {
    /// Returns false once the surface has unsubscribed
    pub fn send(&self, event: PanelEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_subscribed(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Surface side of the event channel
///
/// Dropping or [`unsubscribe`](Self::unsubscribe)-ing it stops delivery.
#[derive(Debug)]
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<PanelEvent>,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Option<PanelEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PanelEvent> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

pub fn event_channel() -> (PanelEventSender, EventSubscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PanelEventSender { tx }, EventSubscription { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> PanelInfo {
        PanelInfo {
            name: "XK-24".to_string(),
            row_count: 6,
            col_count: 4,
            has_jog: false,
            has_shuttle: false,
            has_joystick: false,
            has_tbar: false,
        }
    }

    #[test]
    fn test_bounds() {
        let info = info();
        assert!(info.contains(LogicalPosition::new(5, 3)));
        assert!(!info.contains(LogicalPosition::new(6, 0)));
        assert!(!info.contains(LogicalPosition::new(0, 4)));
        assert_eq!(info.device_index(LogicalPosition::new(0, 9999)), None);
        assert_eq!(
            info.device_index(LogicalPosition::new(5, 3)),
            Some(DeviceIndex(24))
        );
    }

    #[test]
    fn test_device_indices_cover_panel() {
        let indices: Vec<_> = info().device_indices().collect();
        assert_eq!(indices.len(), 24);
        assert_eq!(indices.first(), Some(&DeviceIndex(1)));
        assert_eq!(indices.last(), Some(&DeviceIndex(24)));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (tx, sub) = event_channel();
        assert!(tx.send(PanelEvent::Disconnected));
        sub.unsubscribe();
        assert!(!tx.is_subscribed());
        assert!(!tx.send(PanelEvent::Disconnected));
    }
}
