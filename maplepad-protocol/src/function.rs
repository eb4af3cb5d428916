//! Function codes
//!
//! Each capability a peripheral offers is one bit of the function mask.
//! Function-level commands carry the code of the target function as their
//! first payload word.

/// Peripheral capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FunctionCode {
    Controller,
    Storage,
    Screen,
    Timer,
    Vibration,
}

const FN_CONTROLLER: u32 = 0x0000_0001;
const FN_STORAGE: u32 = 0x0000_0002;
const FN_SCREEN: u32 = 0x0000_0004;
const FN_TIMER: u32 = 0x0000_0008;
const FN_VIBRATION: u32 = 0x0000_0100;

impl FunctionCode {
    /// Parse a single-bit function code
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            FN_CONTROLLER => Some(FunctionCode::Controller),
            FN_STORAGE => Some(FunctionCode::Storage),
            FN_SCREEN => Some(FunctionCode::Screen),
            FN_TIMER => Some(FunctionCode::Timer),
            FN_VIBRATION => Some(FunctionCode::Vibration),
            _ => None,
        }
    }

    /// Convert to the function mask bit
    pub fn to_word(self) -> u32 {
        match self {
            FunctionCode::Controller => FN_CONTROLLER,
            FunctionCode::Storage => FN_STORAGE,
            FunctionCode::Screen => FN_SCREEN,
            FunctionCode::Timer => FN_TIMER,
            FunctionCode::Vibration => FN_VIBRATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_bits() {
        assert_eq!(FunctionCode::Controller.to_word(), 0x001);
        assert_eq!(FunctionCode::Vibration.to_word(), 0x100);
        assert_eq!(FunctionCode::from_word(0x004), Some(FunctionCode::Screen));
    }

    #[test]
    fn test_multi_bit_word_is_not_a_function() {
        assert_eq!(FunctionCode::from_word(0x00E), None);
        assert_eq!(FunctionCode::from_word(0), None);
    }
}
