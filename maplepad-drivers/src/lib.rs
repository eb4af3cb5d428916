//! Hardware driver implementations
//!
//! Concrete implementations of the seams defined in the display crate:
//!
//! - Panels (SSD1331 96x64 colour OLED over SPI)

#![no_std]
#![deny(unsafe_code)]

pub mod panel;
