//! Configuration type definitions
//!
//! Defaults describe a first-party controller with a VMU in slot 1 and a
//! rumble pack in slot 2.

use heapless::String;

use maplepad_protocol::info::{NAME_LEN, VERSION_LEN};

/// Default panel colour for lit VMU pixels (RGB565 red)
pub const DEFAULT_PIXEL_COLOR: u16 = 0xF800;

/// Default overlay lifetime
pub const DEFAULT_OVERLAY_MS: u32 = 3000;

/// Default quiet time before a dirty flash sector is committed
pub const DEFAULT_SETTLE_MS: u32 = 50;

/// What a peripheral tells the console about itself
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    /// Product name
    pub name: String<NAME_LEN>,
    /// Firmware version string (extended device info)
    pub version: String<VERSION_LEN>,
    /// Region bits; 0xFF is all regions
    pub area_code: u8,
    /// Connector direction
    pub direction: u8,
    /// Standby current draw (mA)
    pub standby_ma: f32,
    /// Maximum current draw (mA)
    pub max_ma: f32,
}

impl Identity {
    /// Build an identity, truncating strings that do not fit
    pub fn new(name: &str, version: &str, standby_ma: f32, max_ma: f32) -> Self {
        Self {
            name: truncated(name),
            version: truncated(version),
            area_code: 0xFF,
            direction: 0x00,
            standby_ma,
            max_ma,
        }
    }

    /// The Dreamcast controller
    pub fn controller() -> Self {
        Self::new(
            "Dreamcast Controller",
            "Version 1.010,1998/09/28,315-6211-AB   ,Analog Module : The 4th Edition.5/8  +DF",
            43.0,
            50.0,
        )
    }

    /// The Visual Memory unit
    pub fn vmu() -> Self {
        Self::new(
            "Visual Memory",
            "Version 1.005,1999/04/15,315-6208-03,SEGA Visual Memory System BIOS",
            12.4,
            13.0,
        )
    }

    /// The rumble pack
    pub fn vibration() -> Self {
        Self::new(
            "Puru Puru Pack",
            "Version 1.000,1998/11/10,315-6211-AH   ,Vibration Motor:1 , Fm:4 - 30Hz ,Pow:7",
            20.0,
            160.0,
        )
    }

    /// Standby current in the 0.1 mA units of the info block
    pub fn standby_current(&self) -> u16 {
        tenths_of_ma(self.standby_ma)
    }

    /// Maximum current in the 0.1 mA units of the info block
    pub fn max_current(&self) -> u16 {
        tenths_of_ma(self.max_ma)
    }
}

fn tenths_of_ma(ma: f32) -> u16 {
    // Float-to-int `as` saturates; negative values clamp to zero
    (ma * 10.0 + 0.5) as u16
}

/// Longest prefix of `text` that fits in `N` bytes without splitting a char
pub(crate) fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Rumble pack slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VibrationConfig {
    /// Attach the rumble pack as the second sub-peripheral
    pub enabled: bool,
    pub identity: Identity,
}

impl Default for VibrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            identity: Identity::vibration(),
        }
    }
}

/// VMU screen mirror settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// RGB565 colour of lit pixels
    pub color: u16,
    /// How long status overlays stay up
    pub overlay_ms: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: DEFAULT_PIXEL_COLOR,
            overlay_ms: DEFAULT_OVERLAY_MS,
        }
    }
}

/// Card persistence settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageConfig {
    /// A sector is committed once no write has touched it for this long
    pub settle_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub controller: Identity,
    pub vmu: Identity,
    pub vibration: VibrationConfig,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            controller: Identity::controller(),
            vmu: Identity::vmu(),
            vibration: VibrationConfig::default(),
            display: DisplayConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_encoding() {
        let vmu = Identity::vmu();
        assert_eq!(vmu.standby_current(), 124);
        assert_eq!(vmu.max_current(), 130);
        assert_eq!(Identity::vibration().max_current(), 1600);
    }

    #[test]
    fn test_default_identities_fit() {
        let controller = Identity::controller();
        assert_eq!(controller.name.as_str(), "Dreamcast Controller");
        assert!(controller.version.as_str().ends_with("+DF"));
        assert_eq!(controller.area_code, 0xFF);
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let name: String<4> = truncated("Visual Memory");
        assert_eq!(name.as_str(), "Visu");
    }

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert!(!config.vibration.enabled);
        assert_eq!(config.display.color, 0xF800);
        assert_eq!(config.display.overlay_ms, 3000);
        assert_eq!(config.storage.settle_ms, 50);
    }
}
