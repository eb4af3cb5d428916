//! Timed overlay banner
//!
//! One message at a time; a new message replaces the current one and
//! restarts the timer.

use heapless::String;

use crate::font::{CELL_HEIGHT, CELL_WIDTH};
use crate::surface::{Surface, BLACK, PANEL_HEIGHT, PANEL_WIDTH};

/// Characters that fit across the panel
pub const OVERLAY_LEN: usize = PANEL_WIDTH / CELL_WIDTH;

/// Top row of the banner
pub const BANNER_Y: usize = PANEL_HEIGHT - CELL_HEIGHT;

/// Default lifetime of an overlay
pub const DEFAULT_TTL_MS: u64 = 3000;

/// A transient status message
#[derive(Debug, Clone)]
pub struct Overlay {
    text: String<OVERLAY_LEN>,
    color: u16,
    deadline_ms: Option<u64>,
    ttl_ms: u64,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MS)
    }
}

impl Overlay {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            text: String::new(),
            color: 0xFFFF,
            deadline_ms: None,
            ttl_ms,
        }
    }

    /// Show `text` until `now_ms + ttl`; text longer than the panel is cut
    pub fn show(&mut self, text: &str, color: u16, now_ms: u64) {
        self.text.clear();
        for c in text.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
        self.color = color;
        self.deadline_ms = Some(now_ms.saturating_add(self.ttl_ms));
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms < deadline)
    }

    /// Drop the overlay if its deadline has passed
    ///
    /// Returns true if it was dropped by this call.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Draw the banner along the bottom edge if the overlay is live
    pub fn render(&self, surface: &mut Surface, now_ms: u64) {
        if !self.is_active(now_ms) {
            return;
        }
        surface.fill_rect(0, BANNER_Y, PANEL_WIDTH, CELL_HEIGHT, BLACK);

        let width = self.text.chars().count() * CELL_WIDTH;
        let x = PANEL_WIDTH.saturating_sub(width) / 2;
        // Text is pre-truncated to the panel width
        let _ = surface.put_string(x, BANNER_Y, &self.text, self.color);
    }
}
