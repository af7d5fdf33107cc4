//! In-memory panel for the simulator and tests
//!
//! Every write is logged and recorded so callers can inspect what a real
//! panel would have been told.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::buttons::DeviceIndex;
use super::protocol::{PanelHardware, PanelInfo};
use crate::display::color::ButtonColor;
use crate::error::HardwareError;

/// One write the panel received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareOp {
    Backlight(DeviceIndex, ButtonColor),
    Intensity { unpressed: u8, pressed: u8 },
    IndicatorLed { led: u8, on: bool },
    Close,
}

#[derive(Debug, Default)]
struct Recorder {
    ops: Vec<HardwareOp>,
    failing_buttons: HashSet<DeviceIndex>,
    fail_all: bool,
}

/// Shared view of a [`VirtualPanel`]'s history, usable after the panel has
/// been handed to a surface
#[derive(Debug, Clone, Default)]
pub struct PanelLog {
    inner: Arc<Mutex<Recorder>>,
}

impl PanelLog {
    fn lock(&self) -> MutexGuard<'_, Recorder> {
        // A panicking writer cannot leave the recorder inconsistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ops(&self) -> Vec<HardwareOp> {
        self.lock().ops.clone()
    }

    pub fn clear(&self) {
        self.lock().ops.clear();
    }

    /// Backlight writes only
    pub fn backlights(&self) -> Vec<(DeviceIndex, ButtonColor)> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match *op {
                HardwareOp::Backlight(index, color) => Some((index, color)),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, HardwareOp::Close))
            .count()
    }

    /// Make backlight writes to one key fail
    pub fn fail_button(&self, index: DeviceIndex) {
        self.lock().failing_buttons.insert(index);
    }

    /// Make every write fail
    pub fn fail_all(&self, fail: bool) {
        self.lock().fail_all = fail;
    }
}

pub struct VirtualPanel {
    info: PanelInfo,
    log: PanelLog,
    closed: bool,
}

impl VirtualPanel {
    pub fn new(info: PanelInfo) -> Self {
        Self {
            info,
            log: PanelLog::default(),
            closed: false,
        }
    }

    pub fn log(&self) -> PanelLog {
        self.log.clone()
    }

    fn write(&mut self, op: HardwareOp) -> Result<(), HardwareError> {
        if self.closed {
            return Err(HardwareError::Closed);
        }

        let mut recorder = self.log.lock();
        if recorder.fail_all {
            return Err(HardwareError::Write("simulated failure".to_string()));
        }
        if let HardwareOp::Backlight(index, _) = op {
            if recorder.failing_buttons.contains(&index) {
                return Err(HardwareError::Write(format!(
                    "simulated failure on button {}",
                    index
                )));
            }
        }
        recorder.ops.push(op);
        Ok(())
    }
}

impl PanelHardware for VirtualPanel {
    fn info(&self) -> &PanelInfo {
        &self.info
    }

    fn set_backlight(
        &mut self,
        index: DeviceIndex,
        color: ButtonColor,
    ) -> Result<(), HardwareError> {
        if index.0 == 0 || index.0 > self.info.button_count() {
            return Err(HardwareError::InvalidButton(index.0));
        }
        debug!("Backlight {} -> {:?}", index, color);
        self.write(HardwareOp::Backlight(index, color))
    }

    fn set_backlight_intensity(&mut self, unpressed: u8, pressed: u8) -> Result<(), HardwareError> {
        debug!("Intensity unpressed={} pressed={}", unpressed, pressed);
        self.write(HardwareOp::Intensity { unpressed, pressed })
    }

    fn set_indicator_led(&mut self, led: u8, on: bool) -> Result<(), HardwareError> {
        debug!("Indicator LED {} {}", led, if on { "on" } else { "off" });
        self.write(HardwareOp::IndicatorLed { led, on })
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.write(HardwareOp::Close)?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::color::RgbColor;

    fn panel() -> VirtualPanel {
        VirtualPanel::new(PanelInfo {
            name: "XK-4".to_string(),
            row_count: 1,
            col_count: 4,
            has_jog: false,
            has_shuttle: false,
            has_joystick: false,
            has_tbar: false,
        })
    }

    #[test]
    fn test_records_writes() {
        let mut panel = panel();
        let log = panel.log();
        panel
            .set_backlight(DeviceIndex(2), RgbColor::RED.into())
            .unwrap();
        panel.set_indicator_led(1, true).unwrap();

        assert_eq!(
            log.ops(),
            vec![
                HardwareOp::Backlight(DeviceIndex(2), ButtonColor::Rgb(RgbColor::RED)),
                HardwareOp::IndicatorLed { led: 1, on: true },
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_button() {
        let mut panel = panel();
        assert_eq!(
            panel.set_backlight(DeviceIndex(5), ButtonColor::Off),
            Err(HardwareError::InvalidButton(5))
        );
        assert_eq!(
            panel.set_backlight(DeviceIndex(0), ButtonColor::Off),
            Err(HardwareError::InvalidButton(0))
        );
    }

    #[test]
    fn test_injected_failures() {
        let mut panel = panel();
        let log = panel.log();
        log.fail_button(DeviceIndex(3));
        assert!(panel.set_backlight(DeviceIndex(3), ButtonColor::Off).is_err());
        assert!(panel.set_backlight(DeviceIndex(4), ButtonColor::Off).is_ok());

        log.fail_all(true);
        assert!(panel.set_indicator_led(1, false).is_err());
        assert_eq!(log.ops().len(), 1);
    }

    #[test]
    fn test_closed_panel_refuses_writes() {
        let mut panel = panel();
        panel.close().unwrap();
        assert_eq!(panel.close(), Err(HardwareError::Closed));
        assert_eq!(panel.log().close_count(), 1);
    }
}
