//! Panel backend trait
//!
//! Defines the interface the pipeline pushes finished frames through.

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with the panel
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
    /// Display not initialized
    NotInitialized,
    /// Payload or frame has the wrong size
    BufferOverflow,
}

/// A physical panel that shows whole RGB565 frames
///
/// Implementations handle bus traffic and controller setup; the pipeline
/// owns the pixels.
pub trait PanelSink {
    /// Reset and configure the panel
    fn initialize(&mut self) -> Result<(), DisplayError>;

    /// Push a full frame, row-major, [`crate::PANEL_WIDTH`] pixels per row
    fn refresh(&mut self, pixels: &[u16]) -> Result<(), DisplayError>;

    /// Blank the panel
    fn clear(&mut self) -> Result<(), DisplayError>;
}
