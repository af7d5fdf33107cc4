mod manager;

pub use manager::{ColorCache, DeviceConfig, PanelState};
