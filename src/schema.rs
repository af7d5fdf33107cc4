//! What a surface registers with the host once, at attach time

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::{AuxChannel, Capabilities, LogicalPosition, PanelInfo};

pub const ILLUMINATE_PRESSED_FIELD: &str = "illuminate_pressed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub colors: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlPosition {
    pub row: u32,
    pub column: u32,
}

/// Grid of controls keyed by control id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceLayout {
    pub style_presets: BTreeMap<&'static str, StylePreset>,
    pub controls: BTreeMap<String, ControlPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConfigField {
    Checkbox {
        id: &'static str,
        label: &'static str,
        default: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProps {
    /// Brightness is a config concern here, not a host slider
    pub brightness: bool,
    pub surface_layout: SurfaceLayout,
    pub transfer_variables: Vec<AuxChannel>,
    pub config_fields: Vec<ConfigField>,
}

pub fn surface_layout(info: &PanelInfo) -> SurfaceLayout {
    let mut controls = BTreeMap::new();
    for row in 0..info.row_count {
        for column in 0..info.col_count {
            controls.insert(
                LogicalPosition::new(row, column).control_id(),
                ControlPosition { row, column },
            );
        }
    }

    SurfaceLayout {
        style_presets: BTreeMap::from([("default", StylePreset { colors: "hex" })]),
        controls,
    }
}

pub fn transfer_variables(info: &PanelInfo) -> Vec<AuxChannel> {
    Capabilities::describe(info).auxiliary_channels()
}

pub fn config_fields() -> Vec<ConfigField> {
    vec![ConfigField::Checkbox {
        id: ILLUMINATE_PRESSED_FIELD,
        label: "Illuminate pressed buttons",
        default: true,
    }]
}

pub fn register_props(info: &PanelInfo) -> RegisterProps {
    RegisterProps {
        brightness: false,
        surface_layout: surface_layout(info),
        transfer_variables: transfer_variables(info),
        config_fields: config_fields(),
    }
}
