use std::sync::Arc;

use tracing::{debug, warn};

use super::buttons::{ButtonMetadata, DeviceIndex, LogicalPosition};
use super::capabilities::{Capabilities, JOG_CHANNEL, SHUTTLE_CHANNEL, TBAR_CHANNEL};
use super::protocol::*;
use crate::display::color::{ButtonColor, RgbColor};
use crate::error::DetachReason;
use crate::host::SurfaceHost;
use crate::state::{DeviceConfig, PanelState};

/// Keeps one panel's backlights in sync with the host and translates panel
/// input into host notifications
pub struct SurfaceManager<H> {
    surface_id: String,
    hardware: H,
    host: Arc<dyn SurfaceHost>,
    capabilities: Capabilities,
    state: PanelState,
}

impl<H: PanelHardware> SurfaceManager<H> {
    pub fn new(surface_id: impl Into<String>, hardware: H, host: Arc<dyn SurfaceHost>) -> Self {
        let info = hardware.info();
        let capabilities = Capabilities::describe(info);
        let state = PanelState::new(info.button_count());

        Self {
            surface_id: surface_id.into(),
            hardware,
            host,
            capabilities,
            state,
        }
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn info(&self) -> &PanelInfo {
        self.hardware.info()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn config(&self) -> DeviceConfig {
        self.state.config
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub(crate) fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Turn every backlight off and forget drawn colors
    ///
    /// A key that fails to blank does not stop the rest. Returns the number
    /// of failed writes.
    pub fn blank(&mut self) -> usize {
        let indices: Vec<DeviceIndex> = self.hardware.info().device_indices().collect();
        let mut failed = 0;

        for index in indices {
            if let Err(e) = self.hardware.set_backlight(index, ButtonColor::Off) {
                debug!(surface = %self.surface_id, "Failed to blank button {}: {}", index, e);
                failed += 1;
            }
        }

        self.state.forget_colors();
        failed
    }

    pub fn set_illuminate_pressed(&mut self, enabled: bool) {
        self.state.config.illuminate_pressed = enabled;
    }

    /// Store the brightness and push both intensity channels to the panel
    pub fn set_brightness(&mut self, percent: u8) {
        self.state.config.brightness_percent = percent;

        let (unpressed, pressed) = self.state.intensity();
        debug!(
            surface = %self.surface_id,
            "Setting brightness to {}% (unpressed={}, pressed={})",
            percent, unpressed, pressed
        );
        if let Err(e) = self.hardware.set_backlight_intensity(unpressed, pressed) {
            debug!(surface = %self.surface_id, "Failed to set brightness: {}", e);
        }
    }

    /// Draw a host color at a control id
    ///
    /// Ids that don't parse or fall outside the panel are dropped without
    /// error; hosts routinely lay out more keys than a panel has.
    pub fn draw(&mut self, control_id: &str, color: RgbColor) {
        let Ok(position) = control_id.parse::<LogicalPosition>() else {
            debug!(surface = %self.surface_id, "Ignoring draw to malformed id {:?}", control_id);
            return;
        };
        self.draw_at(position, color);
    }

    pub fn draw_at(&mut self, position: LogicalPosition, color: RgbColor) {
        let Some(index) = self.hardware.info().device_index(position) else {
            return;
        };
        self.draw_color_at_index(index, color);
    }

    fn draw_color_at_index(&mut self, index: DeviceIndex, color: RgbColor) {
        let shown = self.state.displayed_color(index, color);

        if let Err(e) = self.hardware.set_backlight(index, shown.into()) {
            debug!(surface = %self.surface_id, "Failed to set backlight: {}", e);
        }

        // Cache what was asked for, not the overlay, so release restores it
        self.state.remember_color(index, color);
    }

    pub fn handle_press(&mut self, index: DeviceIndex, metadata: ButtonMetadata) {
        let control_id = LogicalPosition::from_metadata(metadata).control_id();
        debug!(surface = %self.surface_id, "keyIndex: {}. Id: {}", index, control_id);
        self.state.press(index);

        self.host.key_down(&control_id);

        let illuminate = self.state.config.illuminate_pressed;
        let feedback = self
            .hardware
            .set_indicator_led(PRESS_INDICATOR_LED, true)
            .and_then(|()| {
                if illuminate {
                    self.hardware
                        .set_backlight(index, PRESSED_ALERT_COLOR.into())
                } else {
                    Ok(())
                }
            });
        if let Err(e) = feedback {
            debug!(surface = %self.surface_id, "Failed to set indicator: {}", e);
        }
    }

    pub fn handle_release(&mut self, index: DeviceIndex, metadata: ButtonMetadata) {
        let control_id = LogicalPosition::from_metadata(metadata).control_id();
        debug!(surface = %self.surface_id, "keyIndex: {}. Id: {}", index, control_id);
        self.state.release(index);

        self.host.key_up(&control_id);

        let illuminate = self.state.config.illuminate_pressed;
        let restore = ButtonColor::from(self.state.last_color(index));
        let feedback = self
            .hardware
            .set_indicator_led(PRESS_INDICATOR_LED, false)
            .and_then(|()| {
                if illuminate {
                    self.hardware.set_backlight(index, restore)
                } else {
                    Ok(())
                }
            });
        if let Err(e) = feedback {
            debug!(surface = %self.surface_id, "Failed to set indicator: {}", e);
        }
    }

    /// Push a jog pulse and schedule its return to zero
    ///
    /// Every pulse gets its own reset. Overlapping resets all push zero, so
    /// they are left to fire rather than coalesced.
    pub fn handle_jog(&mut self, control: u8, delta: i32) {
        debug!(surface = %self.surface_id, "Jog {} position has changed: {}", control, delta);
        self.host.push_channel_value(JOG_CHANNEL, delta);

        let host = Arc::clone(&self.host);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(JOG_RESET_DELAY).await;
                    host.push_channel_value(JOG_CHANNEL, 0);
                });
            }
            Err(_) => {
                warn!(surface = %self.surface_id, "No async runtime, resetting jog immediately");
                host.push_channel_value(JOG_CHANNEL, 0);
            }
        }
    }

    pub fn handle_shuttle(&mut self, control: u8, position: i32) {
        debug!(
            surface = %self.surface_id,
            "Shuttle {} position has changed: {}",
            control, position
        );
        self.host.push_channel_value(SHUTTLE_CHANNEL, position);
    }

    pub fn handle_tbar(&mut self, control: u8, position: i32) {
        debug!(surface = %self.surface_id, "T-bar {} position has changed: {}", control, position);
        self.host.push_channel_value(TBAR_CHANNEL, position);
    }

    /// Deliver one panel event
    ///
    /// Returns the detach reason for events that end the panel's life.
    /// Analog events from controls the panel does not advertise are dropped.
    pub fn handle_event(&mut self, event: PanelEvent) -> Option<DetachReason> {
        let caps = self.capabilities;

        match event {
            PanelEvent::ButtonDown { index, metadata } => self.handle_press(index, metadata),
            PanelEvent::ButtonUp { index, metadata } => self.handle_release(index, metadata),
            PanelEvent::Jog { control, delta } if caps.jog => self.handle_jog(control, delta),
            PanelEvent::Shuttle { control, position } if caps.shuttle => {
                self.handle_shuttle(control, position)
            }
            PanelEvent::Tbar { control, position } if caps.tbar => {
                self.handle_tbar(control, position)
            }
            PanelEvent::Joystick { control, position } if caps.joystick => {
                // No host channel for the joystick yet
                debug!(
                    surface = %self.surface_id,
                    "Joystick {} position has changed: {:?}",
                    control, position
                );
            }
            PanelEvent::Error(message) => {
                return Some(DetachReason::Transport(message));
            }
            PanelEvent::Disconnected => {
                debug!(
                    surface = %self.surface_id,
                    "X-keys panel of type {} was disconnected",
                    self.hardware.info().name
                );
                return Some(DetachReason::Disconnected);
            }
            other => {
                debug!(surface = %self.surface_id, "No such control, ignoring {:?}", other);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::device::virtual_panel::{HardwareOp, PanelLog, VirtualPanel};
    use crate::host::testing::{HostCall, RecordingHost};

    fn info(rows: u32, cols: u32) -> PanelInfo {
        PanelInfo {
            name: "XK-32".to_string(),
            row_count: rows,
            col_count: cols,
            has_jog: true,
            has_shuttle: true,
            has_joystick: true,
            has_tbar: false,
        }
    }

    fn manager() -> (SurfaceManager<VirtualPanel>, PanelLog, Arc<RecordingHost>) {
        let panel = VirtualPanel::new(info(4, 8));
        let log = panel.log();
        let host = Arc::new(RecordingHost::default());
        let manager = SurfaceManager::new("xkeys:test", panel, host.clone());
        (manager, log, host)
    }

    fn md(row: u32, col: u32) -> ButtonMetadata {
        ButtonMetadata { row, col }
    }

    #[test]
    fn test_blank_turns_off_every_button() {
        let (mut manager, log, _) = manager();
        manager.draw("0/0", RgbColor::RED);
        log.clear();

        assert_eq!(manager.blank(), 0);
        let writes = log.backlights();
        assert_eq!(writes.len(), 32);
        assert!(writes.iter().all(|(_, c)| *c == ButtonColor::Off));
        assert_eq!(writes[0].0, DeviceIndex(1));
        assert_eq!(writes[31].0, DeviceIndex(32));
        assert_eq!(manager.state().last_color(DeviceIndex(1)), None);
    }

    #[test]
    fn test_blank_skips_failing_button() {
        let (mut manager, log, _) = manager();
        log.fail_button(DeviceIndex(3));

        assert_eq!(manager.blank(), 1);
        assert_eq!(log.backlights().len(), 31);
    }

    #[test]
    fn test_draw_maps_to_device_index() {
        let (mut manager, log, _) = manager();
        let color = RgbColor::new(1, 2, 3);
        manager.draw("2/7", color);

        assert_eq!(log.backlights(), vec![(DeviceIndex(31), color.into())]);
        assert_eq!(manager.state().last_color(DeviceIndex(31)), Some(color));
    }

    #[test]
    fn test_out_of_range_draws_are_ignored() {
        let (mut manager, log, _) = manager();
        for id in ["-1/0", "0/9999", "4/0", "0/8", "garbage", ""] {
            manager.draw(id, RgbColor::RED);
        }
        assert!(log.ops().is_empty());
        assert!(manager.state().last_colors().len() == 32);
        assert!((1..=32).all(|i| manager.state().last_color(DeviceIndex(i)).is_none()));
    }

    #[test]
    fn test_draw_while_pressed_overlays_red_but_caches_request() {
        let (mut manager, log, _) = manager();
        manager.handle_press(DeviceIndex(1), md(1, 1));
        log.clear();

        let color = RgbColor::new(0, 128, 64);
        manager.draw("0/0", color);
        assert_eq!(
            log.backlights(),
            vec![(DeviceIndex(1), RgbColor::new(255, 128, 64).into())]
        );
        assert_eq!(manager.state().last_color(DeviceIndex(1)), Some(color));
    }

    #[test]
    fn test_release_restores_requested_color() {
        let (mut manager, log, _) = manager();
        let color = RgbColor::new(0, 0, 200);
        manager.handle_press(DeviceIndex(6), md(2, 2));
        manager.draw("1/1", color);
        log.clear();

        manager.handle_release(DeviceIndex(6), md(2, 2));
        assert_eq!(
            log.ops(),
            vec![
                HardwareOp::IndicatorLed { led: 1, on: false },
                HardwareOp::Backlight(DeviceIndex(6), color.into()),
            ]
        );
    }

    #[test]
    fn test_release_of_undrawn_button_turns_it_off() {
        let (mut manager, log, _) = manager();
        manager.handle_press(DeviceIndex(2), md(2, 1));
        log.clear();
        manager.handle_release(DeviceIndex(2), md(2, 1));
        assert_eq!(log.backlights(), vec![(DeviceIndex(2), ButtonColor::Off)]);
    }

    #[test]
    fn test_press_notifies_with_metadata_position() {
        let (mut manager, log, host) = manager();
        manager.handle_press(DeviceIndex(5), md(1, 2));

        assert_eq!(host.calls(), vec![HostCall::KeyDown("0/1".to_string())]);
        assert!(manager.state().is_pressed(DeviceIndex(5)));
        assert_eq!(
            log.ops(),
            vec![
                HardwareOp::IndicatorLed { led: 1, on: true },
                HardwareOp::Backlight(DeviceIndex(5), PRESSED_ALERT_COLOR.into()),
            ]
        );
    }

    #[test]
    fn test_press_without_illumination_only_lights_indicator() {
        let (mut manager, log, _) = manager();
        manager.set_illuminate_pressed(false);
        manager.handle_press(DeviceIndex(5), md(1, 2));
        manager.handle_release(DeviceIndex(5), md(1, 2));

        assert!(log.backlights().is_empty());
        assert_eq!(
            log.ops(),
            vec![
                HardwareOp::IndicatorLed { led: 1, on: true },
                HardwareOp::IndicatorLed { led: 1, on: false },
            ]
        );
    }

    #[test]
    fn test_key_events_survive_hardware_failures() {
        let (mut manager, log, host) = manager();
        log.fail_all(true);

        manager.handle_press(DeviceIndex(1), md(1, 1));
        manager.handle_release(DeviceIndex(1), md(1, 1));

        assert_eq!(
            host.calls(),
            vec![
                HostCall::KeyDown("0/0".to_string()),
                HostCall::KeyUp("0/0".to_string()),
            ]
        );
        assert!(manager.state().pressed().is_empty());
    }

    #[test]
    fn test_brightness_channels() {
        let (mut manager, log, _) = manager();
        manager.set_brightness(50);
        manager.set_illuminate_pressed(false);
        manager.set_brightness(50);

        assert_eq!(
            log.ops(),
            vec![
                HardwareOp::Intensity {
                    unpressed: 127,
                    pressed: 255
                },
                HardwareOp::Intensity {
                    unpressed: 127,
                    pressed: 127
                },
            ]
        );
        assert_eq!(manager.config().brightness_percent, 50);
    }

    #[test]
    fn test_brightness_failure_is_not_fatal() {
        let (mut manager, log, _) = manager();
        log.fail_all(true);
        manager.set_brightness(30);
        assert_eq!(manager.config().brightness_percent, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jog_pulses_then_resets() {
        let (mut manager, _, host) = manager();
        assert_eq!(
            manager.handle_event(PanelEvent::Jog {
                control: 0,
                delta: 3
            }),
            None
        );
        assert_eq!(host.channel_values(JOG_CHANNEL), vec![3]);

        tokio::time::sleep(JOG_RESET_DELAY + Duration::from_millis(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(host.channel_values(JOG_CHANNEL), vec![3, 0]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(host.channel_values(JOG_CHANNEL), vec![3, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_jog_schedules_a_reset_per_pulse() {
        let (mut manager, _, host) = manager();
        manager.handle_jog(0, 1);
        manager.handle_jog(0, -1);

        tokio::time::sleep(JOG_RESET_DELAY * 2).await;
        tokio::task::yield_now().await;
        assert_eq!(host.channel_values(JOG_CHANNEL), vec![1, -1, 0, 0]);
    }

    #[test]
    fn test_jog_without_runtime_resets_immediately() {
        let (mut manager, _, host) = manager();
        manager.handle_jog(0, -1);
        assert_eq!(host.channel_values(JOG_CHANNEL), vec![-1, 0]);
    }

    #[test]
    fn test_shuttle_and_tbar_pass_through() {
        let (mut manager, _, host) = manager();
        manager.handle_event(PanelEvent::Shuttle {
            control: 0,
            position: -7,
        });
        // This panel has no T-bar
        manager.handle_event(PanelEvent::Tbar {
            control: 0,
            position: 200,
        });
        manager.handle_tbar(0, 128);

        assert_eq!(
            host.calls(),
            vec![
                HostCall::Channel(SHUTTLE_CHANNEL.to_string(), -7),
                HostCall::Channel(TBAR_CHANNEL.to_string(), 128),
            ]
        );
    }

    #[test]
    fn test_joystick_is_ignored() {
        let (mut manager, log, host) = manager();
        let result = manager.handle_event(PanelEvent::Joystick {
            control: 0,
            position: JoystickPosition { x: 1, y: -1, z: 0 },
        });
        assert_eq!(result, None);
        assert!(host.calls().is_empty());
        assert!(log.ops().is_empty());
    }

    #[test]
    fn test_fatal_events_report_detach_reason() {
        let (mut manager, _, _) = manager();
        assert_eq!(
            manager.handle_event(PanelEvent::Disconnected),
            Some(DetachReason::Disconnected)
        );
        assert_eq!(
            manager.handle_event(PanelEvent::Error("pipe".to_string())),
            Some(DetachReason::Transport("pipe".to_string()))
        );
    }
}
