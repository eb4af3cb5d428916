//! Build script for maplepad-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates device.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Longest product name the device info block holds
const NAME_LEN: usize = 30;

/// Longest version string the extended device info block holds
const VERSION_LEN: usize = 80;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceToml {
    controller: Option<IdentityToml>,
    vmu: Option<IdentityToml>,
    vibration: Option<VibrationToml>,
    display: Option<DisplayToml>,
    storage: Option<StorageToml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentityToml {
    name: Option<String>,
    version: Option<String>,
    area: Option<i64>,
    direction: Option<i64>,
    standby_ma: Option<f64>,
    max_ma: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct VibrationToml {
    // Type-checked only
    #[allow(dead_code)]
    enabled: Option<bool>,
    name: Option<String>,
    version: Option<String>,
    area: Option<i64>,
    direction: Option<i64>,
    standby_ma: Option<f64>,
    max_ma: Option<f64>,
}

impl VibrationToml {
    fn identity(&self) -> IdentityToml {
        IdentityToml {
            name: self.name.clone(),
            version: self.version.clone(),
            area: self.area,
            direction: self.direction,
            standby_ma: self.standby_ma,
            max_ma: self.max_ma,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DisplayToml {
    color: Option<i64>,
    overlay_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageToml {
    settle_ms: Option<i64>,
}

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read device.toml", &[e.to_string()]),
    };

    // `deny_unknown_fields` also rejects misspelled keys and sections
    let config: DeviceToml = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail(
            "Invalid device.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    let vibration = config.vibration.as_ref().map(VibrationToml::identity);
    for (section, identity) in [
        ("controller", config.controller.as_ref()),
        ("vmu", config.vmu.as_ref()),
        ("vibration", vibration.as_ref()),
    ] {
        if let Some(identity) = identity {
            validate_identity(section, identity, &mut errors);
        }
    }

    if let Some(display) = &config.display {
        if let Some(color) = display.color {
            check_range(&mut errors, "[display] color", color, 0, 0xFFFF);
        }
        if let Some(ms) = display.overlay_ms {
            check_range(&mut errors, "[display] overlay_ms", ms, 1, 60_000);
        }
    }
    if let Some(ms) = config.storage.as_ref().and_then(|s| s.settle_ms) {
        check_range(&mut errors, "[storage] settle_ms", ms, 0, 10_000);
    }

    if !errors.is_empty() {
        fail("Invalid device configuration", &errors);
    }

    println!("cargo:warning=device.toml validated successfully");
}

fn validate_identity(section: &str, identity: &IdentityToml, errors: &mut Vec<String>) {
    if let Some(name) = &identity.name {
        if name.len() > NAME_LEN {
            errors.push(format!("[{section}] name is longer than {NAME_LEN} bytes"));
        }
    }
    if let Some(version) = &identity.version {
        if version.len() > VERSION_LEN {
            errors.push(format!("[{section}] version is longer than {VERSION_LEN} bytes"));
        }
    }
    if let Some(area) = identity.area {
        check_range(errors, &format!("[{section}] area"), area, 0, 0xFF);
    }
    if let Some(direction) = identity.direction {
        check_range(errors, &format!("[{section}] direction"), direction, 0, 0xFF);
    }
    for (key, ma) in [("standby_ma", identity.standby_ma), ("max_ma", identity.max_ma)] {
        if let Some(ma) = ma {
            if !(0.0..=6553.5).contains(&ma) {
                errors.push(format!("[{section}] {key} must be 0-6553.5"));
            }
        }
    }
}

fn check_range(errors: &mut Vec<String>, key: &str, value: i64, min: i64, max: i64) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{key} must be {min}-{max}"));
    }
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let line = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {:<62} ║", line)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
