//! VMU screen mirroring for Maplepad
//!
//! This crate provides:
//! - `PanelSink` trait for the physical panel (SSD1331 OLED, or anything
//!   else that can take a full RGB565 frame)
//! - Decoding of the console's 48x32 monochrome screen payloads
//! - A 5x7 text renderer and timed overlay banners for status messages
//! - `DisplayPipeline`, which ties these together
//!
//! # Architecture
//!
//! ```text
//! screen payload ──► LcdGrid ──┐
//!                              ├──► Surface (96x64 RGB565) ──► PanelSink
//! status byte ───► Overlay ────┘
//! ```
//!
//! The pipeline owns the framebuffer. Every refresh recomposes the primary
//! image and, while it is live, the overlay banner, so an expired overlay
//! never lingers on the panel.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod backend;
pub mod font;
pub mod lcd;
pub mod overlay;
pub mod pipeline;
pub mod surface;

// Re-export key types
pub use backend::{DisplayError, PanelSink};
pub use lcd::{reverse_byte_order, LcdGrid, LCD_HEIGHT, LCD_WIDTH, LCD_WORDS};
pub use overlay::Overlay;
pub use pipeline::{DisplayPipeline, PipelineState};
pub use surface::{Surface, PANEL_HEIGHT, PANEL_WIDTH};
