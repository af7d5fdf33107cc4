use serde::Serialize;

use super::protocol::PanelInfo;

pub const JOG_CHANNEL: &str = "jogValueVariable";
pub const SHUTTLE_CHANNEL: &str = "shuttleValueVariable";
pub const TBAR_CHANNEL: &str = "tbarValueVariable";

/// Optional controls present on a panel, fixed for the panel's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub jog: bool,
    pub shuttle: bool,
    /// Detected but not forwarded anywhere yet
    pub joystick: bool,
    pub tbar: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDirection {
    Input,
}

/// Named value channel for an analog control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxChannel {
    #[serde(rename = "type")]
    pub direction: ChannelDirection,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const JOG: AuxChannel = AuxChannel {
    direction: ChannelDirection::Input,
    id: JOG_CHANNEL,
    name: "Variable to store Jog value to",
    description: "This will pulse with -1 or 1 before returning to 0 when rotated.",
};

const SHUTTLE: AuxChannel = AuxChannel {
    direction: ChannelDirection::Input,
    id: SHUTTLE_CHANNEL,
    name: "Variable to store Shuttle value to",
    description: "This produces a value between -7 and 7. You can use an expression to convert it into a different range.",
};

const TBAR: AuxChannel = AuxChannel {
    direction: ChannelDirection::Input,
    id: TBAR_CHANNEL,
    name: "Variable to store T-Bar value to",
    description: "This produces a value between 0 and 255. You can use an expression to convert it into a different range.",
};

impl Capabilities {
    pub fn describe(info: &PanelInfo) -> Self {
        Self {
            jog: info.has_jog,
            shuttle: info.has_shuttle,
            joystick: info.has_joystick,
            tbar: info.has_tbar,
        }
    }

    /// One channel per present analog control, in jog, shuttle, T-bar order
    pub fn auxiliary_channels(&self) -> Vec<AuxChannel> {
        [(self.jog, JOG), (self.shuttle, SHUTTLE), (self.tbar, TBAR)]
            .into_iter()
            .filter_map(|(present, channel)| present.then_some(channel))
            .collect()
    }
}
