//! Maple bus wire format
//!
//! This crate defines the packets exchanged between a Dreamcast console and
//! the peripherals plugged into one of its controller ports.
//!
//! # Packet Overview
//!
//! Every packet is a run of 32-bit words followed by a single check byte:
//! ```text
//! ┌─────────┬───────────┬──────────────┬─────────┬──────────────┬─────┐
//! │ LENGTH  │ SENDER    │ RECIPIENT    │ COMMAND │ PAYLOAD      │ CRC │
//! │ 1B      │ 1B        │ 1B           │ 1B      │ 0–255 words  │ 1B  │
//! └─────────┴───────────┴──────────────┴─────────┴──────────────┴─────┘
//! ```
//!
//! LENGTH counts payload words. Words travel most significant byte first and
//! the CRC is the XOR of every byte before it.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod address;
pub mod command;
pub mod events;
pub mod frame;
pub mod function;
pub mod info;

pub use address::Address;
pub use command::{Command, ResponseCode};
pub use events::StatusEvent;
pub use frame::{pack_words, unpack_words, Frame, FrameError, MAX_FRAME_WORDS, MAX_PAYLOAD_WORDS};
pub use function::FunctionCode;
pub use info::{DeviceInfo, DEVICE_INFO_WORDS, EXT_DEVICE_INFO_WORDS};
