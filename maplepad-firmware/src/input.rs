//! Controller buttons
//!
//! Momentary switches to ground on GPIOs with pull-ups. Sticks and
//! triggers are not wired, so they always report rest.

use embassy_rp::gpio::Input;

use maplepad_core::peripheral::function::ControllerState;

/// Number of wired buttons
pub const BUTTON_COUNT: usize = 9;

/// Digital buttons, each paired with its `buttons::*` mask
pub struct ButtonPad {
    pins: [(Input<'static>, u16); BUTTON_COUNT],
}

impl ButtonPad {
    pub fn new(pins: [(Input<'static>, u16); BUTTON_COUNT]) -> Self {
        Self { pins }
    }

    /// Current input snapshot
    pub fn sample(&self) -> ControllerState {
        let buttons = self
            .pins
            .iter()
            .filter(|(pin, _)| pin.is_low())
            .fold(0, |pressed, (_, mask)| pressed | mask);
        ControllerState {
            buttons,
            ..ControllerState::neutral()
        }
    }
}
