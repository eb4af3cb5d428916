//! Cross-core communication channels
//!
//! The bus scheduler and display run on core 1; card commits run on core 0.
//! Everything that crosses between them goes through these statics.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicU32;

use maplepad_display::LCD_WORDS;

/// Channel capacity for status bytes
const STATUS_CHANNEL_SIZE: usize = 8;

/// Latest VMU screen payload, written by the screen callback
///
/// Only the newest frame matters, so a signal overwrites any frame the
/// display has not picked up yet.
pub static SCREEN_FRAME: Signal<CriticalSectionRawMutex, [u32; LCD_WORDS]> = Signal::new();

/// Status bytes for the display overlay (`maplepad_protocol::StatusEvent`)
pub static STATUS: Channel<CriticalSectionRawMutex, u8, STATUS_CHANNEL_SIZE> = Channel::new();

/// Requests served by the bus scheduler, for the heartbeat log
pub static BUS_SERVED: AtomicU32 = AtomicU32::new(0);
