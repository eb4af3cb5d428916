//! Simple TOML parser for device configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `device.toml`. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, float, boolean)
//! - Hexadecimal integers (`0xF800`) and `_` digit separators
//! - [section] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings and escapes
//! - Dotted keys

use super::types::{truncated, DeviceConfig, Identity};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Unknown key for the current section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// String longer than its field
    TooLong,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Controller,
    Vmu,
    Vibration,
    Display,
    Storage,
}

/// Parse TOML configuration into a DeviceConfig
///
/// Keys that are absent keep their defaults.
pub fn parse_config(input: &str) -> Result<DeviceConfig, ParseError> {
    let mut config = DeviceConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    Ok(config)
}

/// Parse a section header line like "[vmu]", trailing comment allowed
fn parse_section_header(line: &str) -> Result<Section, ParseError> {
    let end = line.find(']').ok_or(ParseError::InvalidSection)?;
    let rest = line[end + 1..].trim();
    if !rest.is_empty() && !rest.starts_with('#') {
        return Err(ParseError::InvalidSection);
    }

    match line[1..end].trim() {
        "controller" => Ok(Section::Controller),
        "vmu" => Ok(Section::Vmu),
        "vibration" => Ok(Section::Vibration),
        "display" => Ok(Section::Display),
        "storage" => Ok(Section::Storage),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments outside strings
    let mut in_string = false;
    let mut end = value.len();
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let value = value[..end].trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Apply a key/value pair to the current section
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut DeviceConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Controller => apply_identity(&mut config.controller, key, value),
        Section::Vmu => apply_identity(&mut config.vmu, key, value),
        Section::Vibration => match key {
            "enabled" => {
                config.vibration.enabled = parse_bool(value)?;
                Ok(())
            }
            _ => apply_identity(&mut config.vibration.identity, key, value),
        },
        Section::Display => {
            match key {
                "color" => config.display.color = parse_int(value)?,
                "overlay_ms" => config.display.overlay_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Storage => {
            match key {
                "settle_ms" => config.storage.settle_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Root => Err(ParseError::UnknownKey),
    }
}

fn apply_identity(identity: &mut Identity, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "name" => identity.name = parse_fixed(value)?,
        "version" => identity.version = parse_fixed(value)?,
        "area" => identity.area_code = parse_int(value)?,
        "direction" => identity.direction = parse_int(value)?,
        "standby_ma" => identity.standby_ma = parse_float(value)?,
        "max_ma" => identity.max_ma = parse_float(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

/// Parse a quoted string value
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseError::InvalidValue)
    }
}

/// Parse a string into a fixed-capacity field
fn parse_fixed<const N: usize>(value: &str) -> Result<heapless::String<N>, ParseError> {
    let text = parse_string(value)?;
    if text.len() > N {
        return Err(ParseError::TooLong);
    }
    Ok(truncated(text))
}

/// Parse an integer value, decimal or 0x-prefixed hexadecimal
fn parse_int<T: TryFrom<u64>>(value: &str) -> Result<T, ParseError> {
    let mut digits: heapless::String<24> = heapless::String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }

    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    };
    let n = parsed.map_err(|_| ParseError::InvalidValue)?;
    T::try_from(n).map_err(|_| ParseError::InvalidValue)
}

/// Parse a non-negative float value
fn parse_float(value: &str) -> Result<f32, ParseError> {
    let n: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
    if n.is_finite() && n >= 0.0 {
        Ok(n)
    } else {
        Err(ParseError::InvalidValue)
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a = 1"), Some(("a", "1")));
        assert_eq!(parse_key_value("a = 1 # note"), Some(("a", "1")));
        assert_eq!(
            parse_key_value(r#"name = "A # B" # note"#),
            Some(("name", "\"A # B\""))
        );
        assert_eq!(parse_key_value("a ="), None);
        assert_eq!(parse_key_value("no equals"), None);
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int::<u16>("0xF800"), Ok(0xF800));
        assert_eq!(parse_int::<u32>("3_000"), Ok(3000));
        assert_eq!(parse_int::<u8>("256"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("-1"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("[vmu]"), Ok(Section::Vmu));
        assert_eq!(parse_section_header("[ display ] # panel"), Ok(Section::Display));
        assert_eq!(parse_section_header("[heater]"), Err(ParseError::InvalidSection));
        assert_eq!(parse_section_header("[vmu"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(parse_config("# nothing\n\n"), Ok(DeviceConfig::default()));
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
# Maplepad device configuration

[controller]
name = "Arcade Stick"
area = 0x01

[vmu]
standby_ma = 12.5
max_ma = 13

[vibration]
enabled = true
max_ma = 150.0

[display]
color = 0x07E0   # green
overlay_ms = 1_500

[storage]
settle_ms = 100
"#,
        )
        .unwrap();

        assert_eq!(config.controller.name.as_str(), "Arcade Stick");
        assert_eq!(config.controller.area_code, 0x01);
        // Untouched keys keep their defaults
        assert_eq!(config.controller.version, Identity::controller().version);
        assert_eq!(config.vmu.standby_current(), 125);
        assert_eq!(config.vmu.max_current(), 130);
        assert!(config.vibration.enabled);
        assert_eq!(config.vibration.identity.max_current(), 1500);
        assert_eq!(config.display.color, 0x07E0);
        assert_eq!(config.display.overlay_ms, 1500);
        assert_eq!(config.storage.settle_ms, 100);
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert_eq!(
            parse_config("[display]\nbrightness = 3\n"),
            Err(ParseError::UnknownKey)
        );
        assert_eq!(parse_config("orphan = 1\n"), Err(ParseError::UnknownKey));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            parse_config("[vibration]\nenabled = yes\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[vmu]\nname = Visual\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[vmu]\nmax_ma = -4.0\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[vmu]\nname = \"0123456789012345678901234567890\"\n"),
            Err(ParseError::TooLong)
        );
    }
}
