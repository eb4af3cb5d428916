//! Panel drivers
//!
//! Each driver implements `maplepad_display::PanelSink` and owns its bus.

pub mod ssd1331;

pub use ssd1331::Ssd1331;
