//! Vibration function: the rumble pack motor

use maplepad_protocol::{Command, FunctionCode, ResponseCode};

use super::{wrong_length, Reply};

/// Definition word: one motor, fixed frequency range
pub const DEFINITION: u32 = 0x0101_0000;

/// Receives every motor command the console sends
pub type VibrationObserver = fn(VibrationCommand);

/// Raw SET_CONDITION word for the motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VibrationCommand {
    pub raw: u32,
}

impl VibrationCommand {
    /// Motor select and continuous-mode flags
    pub fn control(&self) -> u8 {
        (self.raw >> 24) as u8
    }

    /// Forward and reverse intensity nibbles
    pub fn power(&self) -> u8 {
        (self.raw >> 16) as u8
    }

    pub fn frequency(&self) -> u8 {
        (self.raw >> 8) as u8
    }

    /// Intensity ramp
    pub fn increment(&self) -> u8 {
        self.raw as u8
    }

    /// Returns true if the command stops the motor
    pub fn is_stop(&self) -> bool {
        self.power() == 0
    }
}

/// Vibration function
pub struct Vibration {
    last: VibrationCommand,
    observer: Option<VibrationObserver>,
}

impl Vibration {
    pub fn new(observer: Option<VibrationObserver>) -> Self {
        Self {
            last: VibrationCommand::default(),
            observer,
        }
    }

    /// Last command received
    pub fn last_command(&self) -> VibrationCommand {
        self.last
    }

    pub(super) fn handle(&mut self, command: Command, payload: &[u32]) -> Reply {
        match command {
            Command::SetCondition => {
                if let Some(reply) = wrong_length(payload, 2) {
                    return reply;
                }
                self.last = VibrationCommand { raw: payload[1] };
                if let Some(observer) = self.observer {
                    observer(self.last);
                }
                Reply::Ack
            }
            Command::GetCondition => wrong_length(payload, 1)
                .unwrap_or_else(|| Reply::data(FunctionCode::Vibration, &[self.last.raw])),
            _ => Reply::Error(ResponseCode::UnknownCommand),
        }
    }
}
