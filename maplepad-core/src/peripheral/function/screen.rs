//! Screen function: the VMU's monochrome LCD
//!
//! The console sends the whole bitmap in one block write. The function does
//! not interpret pixels; it hands the raw words to a callback.

use maplepad_protocol::{Command, ResponseCode};

use super::{wrong_length, Reply};

/// Receives each screen payload, one bit per pixel, rows top to bottom
pub type ScreenCallback = fn(&[u32]);

/// Standard VMU LCD width
pub const SCREEN_WIDTH: usize = 48;

/// Standard VMU LCD height
pub const SCREEN_HEIGHT: usize = 32;

/// Definition word of the standard VMU LCD
pub const DEFINITION: u32 = 0x0005_1000;

/// Words in a full-screen payload
pub const SCREEN_WORDS: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 32;

/// Screen function
pub struct Screen {
    callback: ScreenCallback,
    width: usize,
    height: usize,
}

impl Screen {
    pub fn new(callback: ScreenCallback, width: usize, height: usize) -> Self {
        Self {
            callback,
            width,
            height,
        }
    }

    /// Words expected in a screen payload
    pub fn payload_words(&self) -> usize {
        self.width * self.height / 32
    }

    /// Definition word reported for the LCD
    pub fn definition(&self) -> u32 {
        DEFINITION
    }

    pub(super) fn handle(&mut self, command: Command, payload: &[u32]) -> Reply {
        match command {
            Command::BlockWrite => {
                // function code, location, bitmap
                if payload.len() != 2 + self.payload_words() {
                    return Reply::Error(ResponseCode::Resend);
                }
                (self.callback)(&payload[2..]);
                Reply::Ack
            }
            Command::BlockCompleteWrite => wrong_length(payload, 2).unwrap_or(Reply::Ack),
            _ => Reply::Error(ResponseCode::UnknownCommand),
        }
    }
}
