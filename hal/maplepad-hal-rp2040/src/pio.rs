//! PIO clock helpers
//!
//! The transmit program emits one line state per PIO cycle, so the state
//! period is set entirely by the clock divider.

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Time each line state is held on the bus (two states per bit, 2 Mbit/s)
pub const STATE_PERIOD_NS: u32 = 250;

/// Smallest divider the hardware accepts (1.0 in 16.8 fixed point)
const MIN_DIVIDER_BITS: u32 = 1 << 8;

/// Largest divider the hardware accepts
const MAX_DIVIDER_BITS: u32 = 0x00FF_FFFF;

/// Clock divider for a PIO cycle of `period_ns`, as raw 16.8 fixed point
///
/// divider = SYS_CLK * period, scaled by 256 for the fractional byte.
pub const fn clock_divider_bits(period_ns: u32) -> u32 {
    let bits = (SYS_CLK_HZ as u64 * period_ns as u64 * 256) / 1_000_000_000;
    if bits < MIN_DIVIDER_BITS as u64 {
        MIN_DIVIDER_BITS
    } else if bits > MAX_DIVIDER_BITS as u64 {
        MAX_DIVIDER_BITS
    } else {
        bits as u32
    }
}

/// Split raw divider bits into (integer, fraction)
pub const fn split_divider(bits: u32) -> (u16, u8) {
    ((bits >> 8) as u16, bits as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_period_divider() {
        // 125 MHz * 250 ns = 31.25 cycles
        let bits = clock_divider_bits(STATE_PERIOD_NS);
        assert_eq!(split_divider(bits), (31, 64));
    }

    #[test]
    fn test_divider_limits() {
        assert_eq!(clock_divider_bits(0), MIN_DIVIDER_BITS);
        assert_eq!(clock_divider_bits(u32::MAX), MAX_DIVIDER_BITS);
    }
}
