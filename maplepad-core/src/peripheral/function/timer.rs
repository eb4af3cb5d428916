//! Timer function: the VMU real-time clock and buzzer
//!
//! The console sets the clock with a block write and reads it back with a
//! block read. The clock keeps running from the last setting using the
//! caller's monotonic timestamps.

use maplepad_protocol::{Command, FunctionCode, ResponseCode};

use super::{wrong_length, Reply};

/// Definition word of the VMU clock
pub const DEFINITION: u32 = 0x7E7E_3F40;

/// Called when the console sets the clock
pub type SetTimeCallback = fn(&SetTime);

/// Called with the buzzer pulse width and duty
pub type PwmCallback = fn(u8, u8);

/// VMU buttons as reported by GET_CONDITION: active-low, all released
const RELEASED_BUTTONS: u32 = 0xFF00_0000;

/// A calendar date and time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetTime {
    pub year: u16,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Monday
    pub day_of_week: u8,
}

impl SetTime {
    /// Midnight on 2000-01-01, a Saturday
    pub const fn epoch() -> Self {
        Self {
            year: 2000,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            day_of_week: 5,
        }
    }

    /// Decode the two clock words
    pub fn from_words(w0: u32, w1: u32) -> Self {
        Self {
            year: (w0 >> 16) as u16,
            month: (w0 >> 8) as u8,
            day: w0 as u8,
            hour: (w1 >> 24) as u8,
            minute: (w1 >> 16) as u8,
            second: (w1 >> 8) as u8,
            day_of_week: w1 as u8,
        }
    }

    /// Encode as the two clock words
    pub fn to_words(&self) -> [u32; 2] {
        [
            (self.year as u32) << 16 | (self.month as u32) << 8 | self.day as u32,
            (self.hour as u32) << 24
                | (self.minute as u32) << 16
                | (self.second as u32) << 8
                | self.day_of_week as u32,
        ]
    }

    /// This time advanced by `seconds`
    pub fn advanced(&self, seconds: u64) -> Self {
        let since_midnight =
            self.hour as u64 * 3600 + self.minute as u64 * 60 + self.second as u64 + seconds;
        let mut days = since_midnight / 86_400;
        let rest = since_midnight % 86_400;

        let mut out = *self;
        out.hour = (rest / 3600) as u8;
        out.minute = (rest / 60 % 60) as u8;
        out.second = (rest % 60) as u8;
        out.day_of_week = ((self.day_of_week as u64 + days) % 7) as u8;

        // Walk forward a month at a time
        let mut month = out.month.clamp(1, 12);
        let mut year = out.year;
        let mut day = (out.day as u64).clamp(1, days_in_month(year, month) as u64);
        loop {
            let length = days_in_month(year, month) as u64;
            if day + days <= length {
                day += days;
                break;
            }
            days -= length - day + 1;
            day = 1;
            if month == 12 {
                month = 1;
                year = year.wrapping_add(1);
            } else {
                month += 1;
            }
        }
        out.year = year;
        out.month = month;
        out.day = day as u8;
        out
    }
}

impl Default for SetTime {
    fn default() -> Self {
        Self::epoch()
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Timer function
pub struct Timer {
    time: SetTime,
    set_at_us: u64,
    on_set_time: Option<SetTimeCallback>,
    on_pwm: Option<PwmCallback>,
}

impl Timer {
    pub fn new(on_set_time: Option<SetTimeCallback>, on_pwm: Option<PwmCallback>) -> Self {
        Self {
            time: SetTime::epoch(),
            set_at_us: 0,
            on_set_time,
            on_pwm,
        }
    }

    /// Current clock value
    pub fn now(&self, now_us: u64) -> SetTime {
        let elapsed = now_us.saturating_sub(self.set_at_us) / 1_000_000;
        self.time.advanced(elapsed)
    }

    pub(super) fn handle(&mut self, command: Command, payload: &[u32], now_us: u64) -> Reply {
        match command {
            Command::GetCondition => wrong_length(payload, 1)
                .unwrap_or_else(|| Reply::data(FunctionCode::Timer, &[RELEASED_BUTTONS])),
            Command::BlockRead => wrong_length(payload, 2)
                .unwrap_or_else(|| Reply::data(FunctionCode::Timer, &self.now(now_us).to_words())),
            Command::BlockWrite => {
                // function code, location, two clock words
                let &[_, _, w0, w1] = payload else {
                    return Reply::Error(ResponseCode::Resend);
                };
                self.time = SetTime::from_words(w0, w1);
                self.set_at_us = now_us;
                if let Some(callback) = self.on_set_time {
                    callback(&self.time);
                }
                Reply::Ack
            }
            Command::SetCondition => {
                let &[_, word] = payload else {
                    return Reply::Error(ResponseCode::Resend);
                };
                let [width, duty, _, _] = word.to_be_bytes();
                if let Some(callback) = self.on_pwm {
                    callback(width, duty);
                }
                Reply::Ack
            }
            _ => Reply::Error(ResponseCode::UnknownCommand),
        }
    }
}
