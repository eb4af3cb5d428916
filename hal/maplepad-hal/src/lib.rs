//! Maplepad Hardware Abstraction Layer
//!
//! This crate defines the seams between the peripheral emulation core and
//! chip-specific code:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  maplepad-core (peripherals, storage)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  maplepad-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!            ┌─────────────────┐
//!            │ maplepad-hal-   │
//!            │    rp2040       │
//!            └─────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`bus::MapleBus`] - packet-level Maple bus transport
//! - [`phase`] - two-wire phase encoding shared by bit-level transports
//! - [`flash`] - flash region geometry and errors

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod flash;
pub mod phase;

// Re-export key types at crate root for convenience
pub use bus::{BusError, MapleBus, Received};
pub use flash::{FlashError, FlashRegion};
