//! Flash access for RP2040
//!
//! The card region is written with blocking erase/program calls. embassy-rp
//! only allows those from core 0, and parks core 1 in RAM for their duration.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

pub use maplepad_hal::flash::{FlashError, FlashRegion};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Blocking flash driver sized for the whole device
pub type BlockingFlash<'d> = Flash<'d, FLASH, Blocking, FLASH_SIZE>;

/// Create the blocking flash driver
pub fn blocking_flash<'d>(flash: Peri<'d, FLASH>) -> BlockingFlash<'d> {
    Flash::new_blocking(flash)
}

/// The last `size` bytes of flash
pub const fn top_region(size: usize) -> FlashRegion {
    FlashRegion::top_of(FLASH_SIZE as u32, size as u32)
}
