mod buttons;
pub mod capabilities;
mod manager;
mod protocol;
pub mod virtual_panel;

pub use buttons::*;
pub use capabilities::{AuxChannel, Capabilities, ChannelDirection};
pub use manager::SurfaceManager;
pub use protocol::*;
pub use virtual_panel::{HardwareOp, PanelLog, VirtualPanel};
