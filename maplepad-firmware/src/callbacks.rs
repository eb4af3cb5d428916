//! Function callbacks
//!
//! The core hands these plain function pointers to the functions it hosts.
//! They run on core 1 inside a bus transaction, so they only log or post to
//! a channel.

use defmt::*;

use maplepad_core::peripheral::function::{SetTime, VibrationCommand};
use maplepad_display::LCD_WORDS;

use crate::channels::SCREEN_FRAME;

/// New LCD contents from the console
pub fn on_screen(words: &[u32]) {
    match <[u32; LCD_WORDS]>::try_from(words) {
        Ok(frame) => SCREEN_FRAME.signal(frame),
        Err(_) => warn!("Screen payload of {} words dropped", words.len()),
    }
}

/// Console set the VMU clock
pub fn on_set_time(time: &SetTime) {
    info!(
        "Clock set: {}-{}-{} {}:{}:{}",
        time.year, time.month, time.day, time.hour, time.minute, time.second
    );
}

/// Console drove the VMU buzzer
pub fn on_pwm(width: u8, duty: u8) {
    debug!("Buzzer: width={} duty={}", width, duty);
}

/// Rumble pack command
pub fn on_vibration(command: VibrationCommand) {
    if command.is_stop() {
        debug!("Vibration stop");
    } else {
        debug!(
            "Vibration: power={=u8:#x} freq={} inc={}",
            command.power(),
            command.frequency(),
            command.increment()
        );
    }
}
