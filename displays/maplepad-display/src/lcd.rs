//! VMU LCD decoding
//!
//! The console sends the 48x32 monochrome LCD as 48 words. Read as bytes in
//! wire order, byte `row * 6 + col / 8` holds eight horizontally adjacent
//! pixels with the most significant bit leftmost. Words arrive in the
//! host's native order, so each one is byte-reversed before unpacking.

use crate::backend::DisplayError;
use crate::surface::Surface;

/// LCD width in pixels
pub const LCD_WIDTH: usize = 48;

/// LCD height in pixels
pub const LCD_HEIGHT: usize = 32;

/// Words in a screen payload
pub const LCD_WORDS: usize = LCD_WIDTH * LCD_HEIGHT / 32;

/// Panel pixels per LCD pixel, each direction
pub const SCALE: usize = 2;

const ROW_BYTES: usize = LCD_WIDTH / 8;
const GRID_BYTES: usize = ROW_BYTES * LCD_HEIGHT;

/// Swap a word between wire and native byte order
pub fn reverse_byte_order(word: u32) -> u32 {
    word.swap_bytes()
}

/// The LCD as a grid of bits
#[derive(Clone)]
pub struct LcdGrid {
    bytes: [u8; GRID_BYTES],
}

impl Default for LcdGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl LcdGrid {
    pub const fn new() -> Self {
        Self {
            bytes: [0; GRID_BYTES],
        }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Replace the grid with a screen payload
    pub fn decode(&mut self, words: &[u32]) -> Result<(), DisplayError> {
        if words.len() != LCD_WORDS {
            return Err(DisplayError::BufferOverflow);
        }
        for (chunk, &word) in self.bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&reverse_byte_order(word).to_le_bytes());
        }
        Ok(())
    }

    /// Returns true if the LCD pixel at (x, y) is lit
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        if x >= LCD_WIDTH || y >= LCD_HEIGHT {
            return false;
        }
        self.bytes[y * ROW_BYTES + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// Number of lit pixels
    pub fn lit_count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Draw lit pixels as `SCALE`x`SCALE` blocks from the panel origin
    pub fn render(&self, surface: &mut Surface, color: u16) {
        for y in 0..LCD_HEIGHT {
            for x in 0..LCD_WIDTH {
                if self.is_set(x, y) {
                    surface.fill_rect(x * SCALE, y * SCALE, SCALE, SCALE, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BLACK;
    use proptest::prelude::*;

    #[test]
    fn test_reverse_byte_order() {
        assert_eq!(reverse_byte_order(0x1234_5678), 0x7856_3412);
    }

    #[test]
    fn test_blank_payload_sets_nothing() {
        let mut grid = LcdGrid::new();
        grid.decode(&[0; LCD_WORDS]).unwrap();
        assert_eq!(grid.lit_count(), 0);

        let mut surface = Surface::new();
        grid.render(&mut surface, 0xF800);
        assert!(surface.pixels().iter().all(|&p| p == BLACK));
    }

    #[test]
    fn test_first_word_low_half_lights_columns_16_to_31() {
        let mut words = [0u32; LCD_WORDS];
        words[0] = 0x0000_FFFF;

        let mut grid = LcdGrid::new();
        grid.decode(&words).unwrap();

        for x in 0..LCD_WIDTH {
            assert_eq!(grid.is_set(x, 0), (16..32).contains(&x), "column {x}");
        }
        assert_eq!(grid.lit_count(), 16);
    }

    #[test]
    fn test_msb_is_leftmost() {
        let mut words = [0u32; LCD_WORDS];
        // Second row starts at byte 6, which is the third byte of word 1
        words[1] = 0x0000_8000;

        let mut grid = LcdGrid::new();
        grid.decode(&words).unwrap();
        assert!(grid.is_set(0, 1));
        assert_eq!(grid.lit_count(), 1);
    }

    #[test]
    fn test_render_scales_by_two() {
        let mut words = [0u32; LCD_WORDS];
        words[0] = 0x0000_0080; // x = 24, y = 0

        let mut grid = LcdGrid::new();
        grid.decode(&words).unwrap();
        let mut surface = Surface::new();
        grid.render(&mut surface, 0x07E0);

        for (x, y) in [(48, 0), (49, 0), (48, 1), (49, 1)] {
            assert_eq!(surface.pixel(x, y), Some(0x07E0));
        }
        assert_eq!(surface.pixels().iter().filter(|&&p| p != BLACK).count(), 4);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut grid = LcdGrid::new();
        assert_eq!(grid.decode(&[0; 47]), Err(DisplayError::BufferOverflow));
    }

    proptest! {
        #[test]
        fn prop_reverse_is_self_inverse(word in any::<u32>()) {
            prop_assert_eq!(reverse_byte_order(reverse_byte_order(word)), word);
        }
    }
}
