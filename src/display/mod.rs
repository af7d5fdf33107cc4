pub mod color;

pub use color::{ButtonColor, RgbColor};
