//! Display pipeline
//!
//! Owns the framebuffer and the panel. Screen payloads replace the primary
//! image, status bytes raise overlays, and every refresh recomposes both so
//! the panel always shows primary plus whatever overlay is still live.

use maplepad_protocol::StatusEvent;

use crate::backend::{DisplayError, PanelSink};
use crate::font::{CELL_HEIGHT, CELL_WIDTH};
use crate::lcd::LcdGrid;
use crate::overlay::Overlay;
use crate::surface::{Surface, BLACK, PANEL_HEIGHT, PANEL_WIDTH, WHITE};

/// Banner colour for failure messages
const FAULT_COLOR: u16 = 0xF800;

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineState {
    Uninitialized,
    Initializing,
    Ready,
}

/// VMU screen mirror
pub struct DisplayPipeline<S> {
    sink: S,
    state: PipelineState,
    surface: Surface,
    grid: LcdGrid,
    overlay: Overlay,
    color: u16,
}

impl<S: PanelSink> DisplayPipeline<S> {
    /// `color` is used for lit LCD pixels; overlays live for `overlay_ms`
    pub fn new(sink: S, color: u16, overlay_ms: u64) -> Self {
        Self {
            sink,
            state: PipelineState::Uninitialized,
            surface: Surface::new(),
            grid: LcdGrid::new(),
            overlay: Overlay::new(overlay_ms),
            color,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Set up the panel
    ///
    /// On failure the pipeline drops back to `Uninitialized` and may be
    /// initialized again.
    pub fn initialize(&mut self) -> Result<(), DisplayError> {
        self.state = PipelineState::Initializing;
        match self.sink.initialize() {
            Ok(()) => {
                self.state = PipelineState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Decode a screen payload and push the result to the panel
    pub fn draw_screen(&mut self, words: &[u32], now_ms: u64) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.grid.decode(words)?;
        self.refresh(now_ms)
    }

    /// Draw text into the framebuffer; shown on the next refresh
    pub fn put_string(&mut self, x: usize, y: usize, text: &str, color: u16) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.surface.put_string(x, y, text, color)
    }

    pub fn put_letter(&mut self, x: usize, y: usize, ch: char, color: u16) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.surface.put_letter(x, y, ch, color)
    }

    pub fn draw_cursor(&mut self, x: usize, y: usize, color: u16) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.surface.draw_cursor(x, y, color)
    }

    /// Push the framebuffer as it is, without recomposing
    pub fn flush(&mut self) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.sink.refresh(self.surface.pixels())
    }

    /// Raise an overlay and refresh
    pub fn show_overlay(&mut self, text: &str, now_ms: u64) -> Result<(), DisplayError> {
        self.raise(text, WHITE, now_ms)
    }

    /// React to a status byte from the rest of the firmware
    ///
    /// Unknown bytes are ignored.
    pub fn notify(&mut self, status: u8, now_ms: u64) -> Result<(), DisplayError> {
        let Some(event) = StatusEvent::from_byte(status) else {
            return Ok(());
        };
        let color = if event.is_fault() { FAULT_COLOR } else { WHITE };
        self.raise(event.text(), color, now_ms)
    }

    /// Drop an expired overlay; call on every loop pass
    ///
    /// Returns true if the panel was refreshed.
    pub fn service(&mut self, now_ms: u64) -> Result<bool, DisplayError> {
        if self.state != PipelineState::Ready || !self.overlay.expire(now_ms) {
            return Ok(false);
        }
        self.refresh(now_ms)?;
        Ok(true)
    }

    /// Blank the framebuffer and the panel, staying ready
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.grid.clear();
        self.surface.fill(BLACK);
        self.sink.clear()
    }

    /// Boot splash
    pub fn show_splash(&mut self) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.surface.fill(BLACK);

        let title = "MAPLEPAD";
        let x = (PANEL_WIDTH - title.len() * CELL_WIDTH) / 2;
        let y = (PANEL_HEIGHT - CELL_HEIGHT) / 2;
        self.surface.put_string(x, y - CELL_HEIGHT, title, self.color)?;
        self.surface.fill_rect(x, y + 1, title.len() * CELL_WIDTH - 1, 1, WHITE);
        self.surface.put_string(x, y + CELL_HEIGHT, "VMU", WHITE)?;

        self.sink.refresh(self.surface.pixels())
    }

    fn raise(&mut self, text: &str, color: u16, now_ms: u64) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.overlay.show(text, color, now_ms);
        self.refresh(now_ms)
    }

    /// Recompose primary and overlay, then push
    fn refresh(&mut self, now_ms: u64) -> Result<(), DisplayError> {
        self.surface.fill(BLACK);
        self.grid.render(&mut self.surface, self.color);
        self.overlay.render(&mut self.surface, now_ms);
        self.sink.refresh(self.surface.pixels())
    }

    fn ensure_ready(&self) -> Result<(), DisplayError> {
        match self.state {
            PipelineState::Ready => Ok(()),
            _ => Err(DisplayError::NotInitialized),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::lcd::LCD_WORDS;
    use crate::overlay::BANNER_Y;
    use std::vec::Vec;

    /// Records every frame pushed to it
    #[derive(Default)]
    struct RecordingPanel {
        frames: Vec<Vec<u16>>,
        clears: usize,
        fail_init: bool,
    }

    impl PanelSink for RecordingPanel {
        fn initialize(&mut self) -> Result<(), DisplayError> {
            if self.fail_init {
                Err(DisplayError::Communication)
            } else {
                Ok(())
            }
        }

        fn refresh(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
            self.frames.push(pixels.to_vec());
            Ok(())
        }

        fn clear(&mut self) -> Result<(), DisplayError> {
            self.clears += 1;
            Ok(())
        }
    }

    fn ready() -> DisplayPipeline<RecordingPanel> {
        let mut pipeline = DisplayPipeline::new(RecordingPanel::default(), 0xF800, 3000);
        pipeline.initialize().unwrap();
        pipeline
    }

    fn banner_lit(frame: &[u16]) -> bool {
        frame[BANNER_Y * PANEL_WIDTH..].iter().any(|&p| p != BLACK)
    }

    #[test]
    fn test_drawing_requires_ready() {
        let mut pipeline = DisplayPipeline::new(RecordingPanel::default(), 0xF800, 3000);
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
        assert_eq!(
            pipeline.draw_screen(&[0; LCD_WORDS], 0),
            Err(DisplayError::NotInitialized)
        );
        assert_eq!(
            pipeline.put_string(0, 0, "HI", WHITE),
            Err(DisplayError::NotInitialized)
        );
        assert_eq!(pipeline.show_splash(), Err(DisplayError::NotInitialized));
    }

    #[test]
    fn test_failed_initialize() {
        let panel = RecordingPanel {
            fail_init: true,
            ..Default::default()
        };
        let mut pipeline = DisplayPipeline::new(panel, 0xF800, 3000);
        assert_eq!(pipeline.initialize(), Err(DisplayError::Communication));
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
    }

    #[test]
    fn test_screen_payload_reaches_panel() {
        let mut pipeline = ready();
        let mut words = [0u32; LCD_WORDS];
        words[0] = 0x0000_FFFF;
        pipeline.draw_screen(&words, 0).unwrap();

        let frame = pipeline.sink().frames.last().unwrap();
        assert_eq!(frame[32], 0xF800);
        assert_eq!(frame[PANEL_WIDTH + 63], 0xF800);
        assert_eq!(frame[31], BLACK);
        assert_eq!(frame[64], BLACK);
    }

    #[test]
    fn test_overlay_survives_refresh_until_deadline() {
        let mut pipeline = ready();
        pipeline.show_overlay("SAVED", 0).unwrap();
        assert!(banner_lit(pipeline.sink().frames.last().unwrap()));

        // Primary refresh inside the window keeps the banner
        pipeline.draw_screen(&[0; LCD_WORDS], 1000).unwrap();
        assert!(banner_lit(pipeline.sink().frames.last().unwrap()));
        assert_eq!(pipeline.service(1000), Ok(false));

        // Past the deadline the service pass restores pure primary content
        assert_eq!(pipeline.service(3500), Ok(true));
        assert!(!banner_lit(pipeline.sink().frames.last().unwrap()));
        assert_eq!(pipeline.service(4000), Ok(false));
    }

    #[test]
    fn test_primary_refresh_after_deadline_has_no_overlay() {
        let mut pipeline = ready();
        pipeline.show_overlay("SAVED", 0).unwrap();

        let mut words = [0u32; LCD_WORDS];
        words[0] = 0x0000_FFFF;
        pipeline.draw_screen(&words, 1000).unwrap();
        assert!(banner_lit(pipeline.sink().frames.last().unwrap()));

        pipeline.draw_screen(&words, 3500).unwrap();
        let frame = pipeline.sink().frames.last().unwrap();
        assert!(!banner_lit(frame));
        // Logical pixels 16..32 of row 0, doubled
        assert_eq!(frame[32], 0xF800);
        assert_eq!(frame[PANEL_WIDTH + 63], 0xF800);
        assert_eq!(frame[31], BLACK);
        assert_eq!(frame[64], BLACK);
    }

    #[test]
    fn test_notify_maps_status_bytes() {
        let mut pipeline = ready();
        pipeline.notify(StatusEvent::SaveFailed.to_byte(), 0).unwrap();
        let frame = pipeline.sink().frames.last().unwrap();
        assert!(frame[BANNER_Y * PANEL_WIDTH..].contains(&FAULT_COLOR));

        let frames = pipeline.sink().frames.len();
        pipeline.notify(0xEE, 10).unwrap();
        assert_eq!(pipeline.sink().frames.len(), frames);
    }

    #[test]
    fn test_clear_stays_ready() {
        let mut pipeline = ready();
        pipeline.draw_screen(&[u32::MAX; LCD_WORDS], 0).unwrap();
        pipeline.clear().unwrap();

        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.sink().clears, 1);
        assert!(pipeline.surface().pixels().iter().all(|&p| p == BLACK));

        // The cleared grid does not come back on the next refresh
        pipeline.show_overlay("X", 0).unwrap();
        assert_eq!(pipeline.surface().pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn test_text_and_splash() {
        let mut pipeline = ready();
        pipeline.put_letter(0, 0, 'A', WHITE).unwrap();
        pipeline.draw_cursor(0, 8, WHITE).unwrap();
        pipeline.flush().unwrap();
        let frame = pipeline.sink().frames.last().unwrap();
        assert_eq!(frame[15 * PANEL_WIDTH], WHITE);

        pipeline.show_splash().unwrap();
        assert!(pipeline.sink().frames.last().unwrap().contains(&0xF800));
    }
}
