//! Device configuration
//!
//! `device.toml` is compiled in and already validated by the build script;
//! parsing it again here only fails if the two parsers disagree.

use defmt::*;

use maplepad_core::config::{parse_config, DeviceConfig};

/// Embedded configuration (compiled into firmware)
/// Edit device.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../device.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load() -> DeviceConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Config: color={=u16:#x} overlay={}ms settle={}ms vibration={}",
                config.display.color,
                config.display.overlay_ms,
                config.storage.settle_ms,
                config.vibration.enabled
            );
            config
        }
        Err(e) => {
            warn!("device.toml rejected ({}), using defaults", e);
            DeviceConfig::default()
        }
    }
}
