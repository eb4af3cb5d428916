//! Controller function: digital buttons, analog triggers and sticks

use maplepad_protocol::{Command, FunctionCode, ResponseCode};

use super::{wrong_length, Reply};

/// Definition word: which buttons and axes the pad has
pub const DEFINITION: u32 = 0x000F_06FE;

/// Button bits of [`ControllerState::buttons`], set while pressed
pub mod buttons {
    pub const C: u16 = 1 << 0;
    pub const B: u16 = 1 << 1;
    pub const A: u16 = 1 << 2;
    pub const START: u16 = 1 << 3;
    pub const UP: u16 = 1 << 4;
    pub const DOWN: u16 = 1 << 5;
    pub const LEFT: u16 = 1 << 6;
    pub const RIGHT: u16 = 1 << 7;
    pub const Z: u16 = 1 << 8;
    pub const Y: u16 = 1 << 9;
    pub const X: u16 = 1 << 10;
    pub const D: u16 = 1 << 11;
}

/// Stick value at rest
pub const STICK_CENTER: u8 = 0x80;

/// Input snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    /// Pressed buttons, see [`buttons`]
    pub buttons: u16,
    pub right_trigger: u8,
    pub left_trigger: u8,
    pub stick_x: u8,
    pub stick_y: u8,
    pub stick2_x: u8,
    pub stick2_y: u8,
}

impl ControllerState {
    /// Nothing pressed, sticks centred
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            right_trigger: 0,
            left_trigger: 0,
            stick_x: STICK_CENTER,
            stick_y: STICK_CENTER,
            stick2_x: STICK_CENTER,
            stick2_y: STICK_CENTER,
        }
    }

    /// The two condition words sent after the function code
    ///
    /// Buttons go out active-low.
    pub fn condition(&self) -> [u32; 2] {
        [
            ((!self.buttons) as u32) << 16
                | (self.right_trigger as u32) << 8
                | self.left_trigger as u32,
            (self.stick_x as u32) << 24
                | (self.stick_y as u32) << 16
                | (self.stick2_x as u32) << 8
                | self.stick2_y as u32,
        ]
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Controller function
#[derive(Debug)]
pub struct Controller {
    state: ControllerState,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: ControllerState::neutral(),
        }
    }

    /// Replace the snapshot reported to the console
    pub fn set_state(&mut self, state: ControllerState) {
        self.state = state;
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub(super) fn handle(&mut self, command: Command, payload: &[u32]) -> Reply {
        match command {
            Command::GetCondition => wrong_length(payload, 1).unwrap_or_else(|| {
                Reply::data(FunctionCode::Controller, &self.state.condition())
            }),
            _ => Reply::Error(ResponseCode::UnknownCommand),
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
