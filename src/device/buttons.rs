//! Control id <-> grid position <-> device button index
//!
//! Hosts address keys by a `"<row>/<column>"` string with zero-based
//! coordinates. The panel numbers its keys 1-based, column-major:
//!
//! ```text
//!   index = column * row_count + row + 1
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ControlIdError;

/// Zero-based key position in the host's grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPosition {
    pub row: u32,
    pub column: u32,
}

/// Row/column as reported by the panel alongside a key event (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMetadata {
    pub row: u32,
    pub col: u32,
}

/// Native 1-based key index of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(pub u32);

impl LogicalPosition {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    pub fn from_metadata(md: ButtonMetadata) -> Self {
        Self::new(md.row.saturating_sub(1), md.col.saturating_sub(1))
    }

    /// Host-facing control id
    pub fn control_id(&self) -> String {
        self.to_string()
    }

    /// Caller must have checked the position against the panel bounds
    #[inline]
    pub fn to_device_index(&self, row_count: u32) -> DeviceIndex {
        DeviceIndex(self.column * row_count + self.row + 1)
    }
}

impl fmt::Display for LogicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row, self.column)
    }
}

impl FromStr for LogicalPosition {
    type Err = ControlIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ControlIdError::Malformed(s.to_string());

        let (row, column) = s.split_once('/').ok_or_else(malformed)?;
        Ok(Self::new(
            parse_coordinate(row).ok_or_else(malformed)?,
            parse_coordinate(column).ok_or_else(malformed)?,
        ))
    }
}

// `u32::from_str` accepts a leading '+', which is not part of the id format
fn parse_coordinate(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl DeviceIndex {
    /// Zero-based slot for per-key tables
    #[inline]
    pub fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
