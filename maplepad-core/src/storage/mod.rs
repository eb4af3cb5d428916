//! Memory card persistence
//!
//! - [`block_store`] keeps the card image in RAM and commits changed flash
//!   sectors from a separate execution context
//! - [`card`] knows the VMU filesystem layout and the blank image

pub mod block_store;
pub mod card;

use maplepad_hal::FlashError;

pub use block_store::{BlockStore, MAX_SECTORS, SECTOR_SIZE};

/// Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash erase/program/read failed
    Flash(FlashError),
    /// Access past the end of the card
    OutOfRange,
    /// Shadow buffer and flash region do not describe the same card
    Geometry,
    /// Commit queue has no room
    QueueFull,
    /// Flash is held by another context
    Busy,
}

impl From<FlashError> for StorageError {
    fn from(e: FlashError) -> Self {
        StorageError::Flash(e)
    }
}

/// Byte-addressed card memory as seen by the storage function
pub trait CardMemory {
    /// Size of the card in bytes
    fn len(&self) -> usize;

    /// Read the latest contents, including writes not yet committed
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Update the card; never waits for flash
    fn write(&self, offset: usize, data: &[u8], now_ms: u64) -> Result<(), StorageError>;

    /// Replace the whole card with the image produced by `fill` and wait
    /// until it is on flash
    fn format(&self, fill: fn(&mut [u8]), now_ms: u64) -> Result<(), StorageError>;
}
