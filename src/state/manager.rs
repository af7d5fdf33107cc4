use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceIndex, FULL_INTENSITY};
use crate::display::color::RgbColor;

/// Live surface settings replayed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Backlight brightness (0-100)
    pub brightness_percent: u8,
    /// Light held keys red and at full intensity
    pub illuminate_pressed: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            brightness_percent: 100,
            illuminate_pressed: true,
        }
    }
}

/// Last color the host asked for, per key
///
/// Sized once from the panel and never resized; `None` means the key was
/// never drawn since the last blank.
#[derive(Debug, Clone)]
pub struct ColorCache {
    colors: Vec<Option<RgbColor>>,
}

impl ColorCache {
    pub fn new(button_count: u32) -> Self {
        Self {
            colors: vec![None; button_count as usize],
        }
    }

    pub fn get(&self, index: DeviceIndex) -> Option<RgbColor> {
        index.slot().and_then(|i| self.colors.get(i).copied().flatten())
    }

    pub fn set(&mut self, index: DeviceIndex, color: RgbColor) {
        if let Some(slot) = index.slot().and_then(|i| self.colors.get_mut(i)) {
            *slot = Some(color);
        }
    }

    pub fn clear(&mut self) {
        self.colors.fill(None);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Mutable state of one attached panel
#[derive(Debug, Clone)]
pub struct PanelState {
    pub config: DeviceConfig,
    pressed: HashSet<DeviceIndex>,
    last_colors: ColorCache,
}

impl PanelState {
    pub fn new(button_count: u32) -> Self {
        Self {
            config: DeviceConfig::default(),
            pressed: HashSet::new(),
            last_colors: ColorCache::new(button_count),
        }
    }

    pub fn press(&mut self, index: DeviceIndex) {
        self.pressed.insert(index);
    }

    pub fn release(&mut self, index: DeviceIndex) {
        self.pressed.remove(&index);
    }

    pub fn is_pressed(&self, index: DeviceIndex) -> bool {
        self.pressed.contains(&index)
    }

    pub fn pressed(&self) -> &HashSet<DeviceIndex> {
        &self.pressed
    }

    /// Color to show for a draw request, with the pressed overlay applied
    pub fn displayed_color(&self, index: DeviceIndex, requested: RgbColor) -> RgbColor {
        if self.config.illuminate_pressed && self.is_pressed(index) {
            requested.with_red_maxed()
        } else {
            requested
        }
    }

    pub fn remember_color(&mut self, index: DeviceIndex, color: RgbColor) {
        self.last_colors.set(index, color);
    }

    pub fn last_color(&self, index: DeviceIndex) -> Option<RgbColor> {
        self.last_colors.get(index)
    }

    pub fn last_colors(&self) -> &ColorCache {
        &self.last_colors
    }

    pub fn forget_colors(&mut self) {
        self.last_colors.clear();
    }

    /// Device intensity values for unpressed and pressed keys
    ///
    /// Percent maps linearly onto 0-255, truncating.
    pub fn intensity(&self) -> (u8, u8) {
        let percent = u16::from(self.config.brightness_percent.min(100));
        let scaled = (percent * 255 / 100) as u8;
        let pressed = if self.config.illuminate_pressed {
            FULL_INTENSITY
        } else {
            scaled
        };
        (scaled, pressed)
    }
}
