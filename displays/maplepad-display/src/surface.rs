//! RGB565 framebuffer sized for the panel

use crate::backend::DisplayError;
use crate::font::{self, CELL_HEIGHT, CELL_WIDTH, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Panel width in pixels
pub const PANEL_WIDTH: usize = 96;

/// Panel height in pixels
pub const PANEL_HEIGHT: usize = 64;

pub const BLACK: u16 = 0x0000;
pub const WHITE: u16 = 0xFFFF;

/// Full-panel pixel buffer, row-major
#[derive(Clone)]
pub struct Surface {
    pixels: [u16; PANEL_WIDTH * PANEL_HEIGHT],
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub const fn new() -> Self {
        Self {
            pixels: [BLACK; PANEL_WIDTH * PANEL_HEIGHT],
        }
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u16> {
        (x < PANEL_WIDTH && y < PANEL_HEIGHT).then(|| self.pixels[y * PANEL_WIDTH + x])
    }

    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    /// Set one pixel; out-of-range coordinates are clipped
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u16) {
        if x < PANEL_WIDTH && y < PANEL_HEIGHT {
            self.pixels[y * PANEL_WIDTH + x] = color;
        }
    }

    /// Fill a rectangle, clipped to the panel
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: u16) {
        let x_end = x.saturating_add(width).min(PANEL_WIDTH);
        let y_end = y.saturating_add(height).min(PANEL_HEIGHT);
        for row in y.min(PANEL_HEIGHT)..y_end {
            self.pixels[row * PANEL_WIDTH + x.min(x_end)..row * PANEL_WIDTH + x_end].fill(color);
        }
    }

    /// Draw one character with its top-left corner at (x, y)
    ///
    /// Only set glyph pixels are written; the background is left alone.
    pub fn put_letter(&mut self, x: usize, y: usize, ch: char, color: u16) -> Result<(), DisplayError> {
        if x > PANEL_WIDTH - GLYPH_WIDTH || y > PANEL_HEIGHT - GLYPH_HEIGHT {
            return Err(DisplayError::InvalidCoordinates);
        }
        for (col, bits) in font::glyph(ch).iter().enumerate() {
            for row in 0..GLYPH_HEIGHT {
                if bits & (1 << row) != 0 {
                    self.set_pixel(x + col, y + row, color);
                }
            }
        }
        Ok(())
    }

    /// Draw a string in 6x8 cells starting at (x, y)
    ///
    /// Characters that would cross the right edge are dropped.
    pub fn put_string(&mut self, x: usize, y: usize, text: &str, color: u16) -> Result<(), DisplayError> {
        if y > PANEL_HEIGHT - GLYPH_HEIGHT || x >= PANEL_WIDTH {
            return Err(DisplayError::InvalidCoordinates);
        }
        let mut cx = x;
        for ch in text.chars() {
            if cx > PANEL_WIDTH - GLYPH_WIDTH {
                break;
            }
            self.put_letter(cx, y, ch, color)?;
            cx += CELL_WIDTH;
        }
        Ok(())
    }

    /// Underline cursor in the cell whose top-left corner is (x, y)
    pub fn draw_cursor(&mut self, x: usize, y: usize, color: u16) -> Result<(), DisplayError> {
        if x > PANEL_WIDTH - GLYPH_WIDTH || y > PANEL_HEIGHT - CELL_HEIGHT {
            return Err(DisplayError::InvalidCoordinates);
        }
        self.fill_rect(x, y + CELL_HEIGHT - 1, GLYPH_WIDTH, 1, color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(surface: &Surface) -> usize {
        surface.pixels().iter().filter(|&&p| p != BLACK).count()
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut surface = Surface::new();
        surface.fill_rect(94, 62, 10, 10, WHITE);
        assert_eq!(lit(&surface), 4);
        assert_eq!(surface.pixel(95, 63), Some(WHITE));
        assert_eq!(surface.pixel(96, 0), None);
    }

    #[test]
    fn test_put_letter() {
        let mut surface = Surface::new();
        surface.put_letter(0, 0, 'I', WHITE).unwrap();
        // Middle column of 'I' is a full vertical bar
        for row in 0..GLYPH_HEIGHT {
            assert_eq!(surface.pixel(2, row), Some(WHITE));
        }
        assert_eq!(surface.pixel(0, 3), Some(BLACK));
    }

    #[test]
    fn test_put_string_advances_by_cell() {
        let mut surface = Surface::new();
        surface.put_string(0, 0, "||", WHITE).unwrap();
        assert_eq!(surface.pixel(2, 0), Some(WHITE));
        assert_eq!(surface.pixel(2 + CELL_WIDTH, 0), Some(WHITE));
        assert_eq!(lit(&surface), 2 * GLYPH_HEIGHT);
    }

    #[test]
    fn test_out_of_bounds_text() {
        let mut surface = Surface::new();
        assert_eq!(
            surface.put_letter(92, 0, 'A', WHITE),
            Err(DisplayError::InvalidCoordinates)
        );
        assert_eq!(
            surface.put_string(0, 60, "A", WHITE),
            Err(DisplayError::InvalidCoordinates)
        );
        // Long strings are cut at the edge
        surface.put_string(0, 0, "ABCDEFGHIJKLMNOPQRSTUVWXYZ", WHITE).unwrap();
        assert_eq!(surface.pixel(95, 3), Some(BLACK));
    }

    #[test]
    fn test_huge_coordinates_are_rejected() {
        let mut surface = Surface::new();
        for (x, y) in [(usize::MAX - 1, 0), (0, usize::MAX), (usize::MAX, usize::MAX)] {
            assert_eq!(
                surface.put_letter(x, y, 'A', WHITE),
                Err(DisplayError::InvalidCoordinates)
            );
            assert_eq!(
                surface.put_string(x, y, "AB", WHITE),
                Err(DisplayError::InvalidCoordinates)
            );
            assert_eq!(
                surface.draw_cursor(x, y, WHITE),
                Err(DisplayError::InvalidCoordinates)
            );
        }
        surface.fill_rect(usize::MAX, 10, usize::MAX, 2, WHITE);
        surface.fill_rect(10, usize::MAX - 1, 4, usize::MAX, WHITE);
        surface.fill_rect(90, 60, usize::MAX, usize::MAX, WHITE);
        assert_eq!(lit(&surface), 6 * 4);
    }

    #[test]
    fn test_cursor_is_bottom_row_of_cell() {
        let mut surface = Surface::new();
        surface.draw_cursor(6, 8, WHITE).unwrap();
        assert_eq!(lit(&surface), GLYPH_WIDTH);
        assert_eq!(surface.pixel(6, 15), Some(WHITE));
    }
}
