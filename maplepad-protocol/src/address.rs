//! Peripheral addressing
//!
//! An address byte splits into a port (top two bits, which controller port
//! the peripheral is plugged into) and a unit:
//! - `0x00`: the console
//! - `0x20`: the main peripheral (the controller itself)
//! - `0x01 << n`: sub-peripheral in expansion slot `n` (0..5)
//!
//! A peripheral does not know its port until the console talks to it, so the
//! port bits are taken from the inbound recipient and echoed back.

/// Port bits of an address
pub const PORT_MASK: u8 = 0xC0;

/// Unit bits of the main peripheral
pub const MAIN_UNIT: u8 = 0x20;

/// Expansion slots behind a main peripheral
pub const MAX_SUB_PERIPHERALS: usize = 5;

/// Mask covering every sub-peripheral unit bit
pub const SUB_UNIT_MASK: u8 = 0x1F;

/// A bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub u8);

impl Address {
    /// Address of the main peripheral on port 0
    pub const fn main() -> Self {
        Self(MAIN_UNIT)
    }

    /// Address of the sub-peripheral in slot `index` on port 0
    pub fn sub(index: usize) -> Option<Self> {
        if index < MAX_SUB_PERIPHERALS {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    /// Port bits
    pub fn port(self) -> u8 {
        self.0 & PORT_MASK
    }

    /// Unit bits
    pub fn unit(self) -> u8 {
        self.0 & !PORT_MASK
    }

    /// Same unit, placed on the port of `other`
    pub fn on_port_of(self, other: Address) -> Self {
        Self(other.port() | self.unit())
    }

    /// Returns true if `recipient` names this unit, on any port
    pub fn matches(self, recipient: Address) -> bool {
        self.unit() == recipient.unit()
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Self(value)
    }
}
