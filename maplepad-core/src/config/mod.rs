//! Device configuration
//!
//! Identities reported to the console plus display and storage tuning. The
//! firmware embeds a `device.toml` and parses it at boot with [`parse_config`].

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
