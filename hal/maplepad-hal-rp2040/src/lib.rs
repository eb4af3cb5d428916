//! RP2040-specific HAL for the Maplepad firmware
//!
//! This crate provides RP2040 implementations of the shared
//! `maplepad-hal` seams:
//!
//! - PIO-driven Maple bus transport (implements `maplepad_hal::MapleBus`)
//! - Blocking flash access for the memory card region
//! - PIO clock divider helpers

#![no_std]

pub mod flash;
pub mod maple;
pub mod pio;

// Re-export shared traits from maplepad-hal for convenience
pub use maplepad_hal::{FlashRegion, MapleBus};
