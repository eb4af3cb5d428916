//! Peripheral functions
//!
//! A function is one capability bit of a peripheral. Function-level commands
//! carry the function code as their first payload word; the owning
//! peripheral routes them here by that code.

pub mod controller;
pub mod screen;
pub mod storage;
pub mod timer;
pub mod vibration;

use heapless::Vec;
use maplepad_protocol::{Command, FunctionCode, ResponseCode, MAX_PAYLOAD_WORDS};

pub use controller::{buttons, Controller, ControllerState};
pub use screen::{Screen, ScreenCallback};
pub use storage::Storage;
pub use timer::{PwmCallback, SetTime, SetTimeCallback, Timer};
pub use vibration::{Vibration, VibrationCommand, VibrationObserver};

/// Outcome of a function-level command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command accepted, nothing to return
    Ack,
    /// Data transfer; the payload starts with the function code
    Data(Vec<u32, MAX_PAYLOAD_WORDS>),
    /// Negative response
    Error(ResponseCode),
}

impl Reply {
    /// Data transfer of `code` followed by `words`
    pub fn data(code: FunctionCode, words: &[u32]) -> Self {
        let mut payload = Vec::new();
        // Only fails if a handler builds more than a full packet
        if payload.push(code.to_word()).is_err() || payload.extend_from_slice(words).is_err() {
            return Reply::Error(ResponseCode::FileError);
        }
        Reply::Data(payload)
    }
}

/// Negative reply for a payload that is not exactly `words` long
///
/// `words` counts the leading function code.
pub(crate) fn wrong_length(payload: &[u32], words: usize) -> Option<Reply> {
    (payload.len() != words).then_some(Reply::Error(ResponseCode::Resend))
}

/// One capability of a peripheral
pub enum Function<'a> {
    Controller(Controller),
    Storage(Storage<'a>),
    Screen(Screen),
    Timer(Timer),
    Vibration(Vibration),
}

impl Function<'_> {
    /// Function code this variant answers
    pub fn code(&self) -> FunctionCode {
        match self {
            Function::Controller(_) => FunctionCode::Controller,
            Function::Storage(_) => FunctionCode::Storage,
            Function::Screen(_) => FunctionCode::Screen,
            Function::Timer(_) => FunctionCode::Timer,
            Function::Vibration(_) => FunctionCode::Vibration,
        }
    }

    /// Definition word reported in the device info block
    pub fn definition(&self) -> u32 {
        match self {
            Function::Controller(_) => controller::DEFINITION,
            Function::Storage(f) => f.definition(),
            Function::Screen(f) => f.definition(),
            Function::Timer(_) => timer::DEFINITION,
            Function::Vibration(_) => vibration::DEFINITION,
        }
    }

    /// Handle a function-level command
    ///
    /// `payload` is the full request payload, function code included.
    pub fn handle(&mut self, command: Command, payload: &[u32], now_us: u64) -> Reply {
        match self {
            Function::Controller(f) => f.handle(command, payload),
            Function::Storage(f) => f.handle(command, payload, now_us),
            Function::Screen(f) => f.handle(command, payload),
            Function::Timer(f) => f.handle(command, payload, now_us),
            Function::Vibration(f) => f.handle(command, payload),
        }
    }
}
