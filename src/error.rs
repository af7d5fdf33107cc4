use thiserror::Error;

/// Failure of a single write to the panel hardware
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("button {0} is not addressable")]
    InvalidButton(u32),
    #[error("panel write failed: {0}")]
    Write(String),
    #[error("panel is closed")]
    Closed,
}

/// A control id that is not of the form `<row>/<column>`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlIdError {
    #[error("malformed control id: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised color: {0:?}")]
pub struct ColorParseError(pub String);

/// Why a surface asked the host to detach it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetachReason {
    #[error("X-keys panel disconnected")]
    Disconnected,
    #[error("X-keys error: {0}")]
    Transport(String),
}
