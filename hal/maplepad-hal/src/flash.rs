//! Flash region geometry
//!
//! The memory card image occupies a fixed region at the high end of the
//! program flash, above the firmware image.

use core::ops::Range;

use embedded_storage::nor_flash::NorFlashErrorKind;

/// Errors from raw flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Offset or length not aligned to the device's erase/program unit
    NotAligned,
    /// Access outside the device or region
    OutOfBounds,
    /// Device reported a failure
    Device,
}

impl From<NorFlashErrorKind> for FlashError {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashError::NotAligned,
            NorFlashErrorKind::OutOfBounds => FlashError::OutOfBounds,
            _ => FlashError::Device,
        }
    }
}

/// A contiguous span of flash, in device offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashRegion {
    /// First byte of the region
    pub offset: u32,
    /// Length in bytes
    pub size: u32,
}

impl FlashRegion {
    /// The last `size` bytes of a `flash_size` byte device
    pub const fn top_of(flash_size: u32, size: u32) -> Self {
        Self {
            offset: flash_size - size,
            size,
        }
    }

    /// Device offsets covered by the region
    pub fn range(&self) -> Range<u32> {
        self.offset..self.offset + self.size
    }

    /// Device offset of `sector` when the region is split into `sector_size` units
    pub fn sector_range(&self, sector: usize, sector_size: usize) -> Option<Range<u32>> {
        let start = sector.checked_mul(sector_size)? as u32;
        let end = start.checked_add(sector_size as u32)?;
        if end > self.size {
            return None;
        }
        Some(self.offset + start..self.offset + end)
    }

    /// Returns true if the region starts and ends on `unit` boundaries
    pub fn is_aligned(&self, unit: u32) -> bool {
        unit != 0 && self.offset % unit == 0 && self.size % unit == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_of_flash() {
        let region = FlashRegion::top_of(2 * 1024 * 1024, 128 * 1024);
        assert_eq!(region.offset, 0x1E_0000);
        assert_eq!(region.range(), 0x1E_0000..0x20_0000);
        assert!(region.is_aligned(4096));
    }

    #[test]
    fn test_sector_range() {
        let region = FlashRegion::top_of(0x20_0000, 0x2_0000);
        assert_eq!(region.sector_range(0, 4096), Some(0x1E_0000..0x1E_1000));
        assert_eq!(region.sector_range(31, 4096), Some(0x1F_F000..0x20_0000));
        assert_eq!(region.sector_range(32, 4096), None);
    }

    #[test]
    fn test_misaligned_region() {
        let region = FlashRegion {
            offset: 0x100,
            size: 0x1000,
        };
        assert!(!region.is_aligned(4096));
        assert!(!region.is_aligned(0));
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(FlashError::from(NorFlashErrorKind::NotAligned), FlashError::NotAligned);
        assert_eq!(FlashError::from(NorFlashErrorKind::OutOfBounds), FlashError::OutOfBounds);
        assert_eq!(FlashError::from(NorFlashErrorKind::Other), FlashError::Device);
    }
}
