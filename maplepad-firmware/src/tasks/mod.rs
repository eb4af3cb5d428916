//! Per-core work loops
//!
//! Core 0 runs the card commit task on the embassy executor; core 1 runs
//! the bus loop with no executor at all.

pub mod bus;
pub mod flush;

pub use bus::bus_loop;
pub use flush::{flush_task, Card};
