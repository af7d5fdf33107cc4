use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::device::PanelInfo;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub panel: PanelConfig,
    pub surface: SurfaceSettings,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home).join(".config/xkeys-surface/config.toml"))
    }
}

/// Description of the panel driven by the simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Model name shown to the host
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub jog: bool,
    pub shuttle: bool,
    pub joystick: bool,
    pub tbar: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            name: "XK-32".to_string(),
            rows: 4,
            columns: 8,
            jog: false,
            shuttle: false,
            joystick: false,
            tbar: false,
        }
    }
}

impl PanelConfig {
    pub fn info(&self) -> PanelInfo {
        PanelInfo {
            name: self.name.clone(),
            row_count: self.rows,
            col_count: self.columns,
            has_jog: self.jog,
            has_shuttle: self.shuttle,
            has_joystick: self.joystick,
            has_tbar: self.tbar,
        }
    }
}

/// Surface settings applied at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Backlight brightness (0-100)
    pub brightness: u8,
    pub illuminate_pressed: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            brightness: 100,
            illuminate_pressed: true,
        }
    }
}

impl SurfaceSettings {
    pub fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig {
            illuminate_pressed: self.illuminate_pressed,
        }
    }
}

/// Config fields the host replays through `reconfigure`
///
/// Hosts send a loose map; a missing field keeps its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub illuminate_pressed: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            illuminate_pressed: true,
        }
    }
}
