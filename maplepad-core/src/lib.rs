//! Board-agnostic core logic for the Maplepad firmware
//!
//! This crate contains everything that answers the console without touching
//! hardware directly:
//!
//! - Peripheral tree (main peripheral, sub-peripherals, functions)
//! - Bus scheduler (one receive/dispatch/respond cycle per tick)
//! - Block store (write-through card shadow with deferred flash commits)
//! - VMU card layout
//! - Device configuration and its TOML subset parser

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod peripheral;
pub mod scheduler;
pub mod storage;
