//! Two-wire phase encoding
//!
//! The Maple bus has two data lines, SDCKA and SDCKB. Each line takes turns
//! acting as the clock while the other carries data: a falling edge on A
//! latches the value of B, a falling edge on B latches the value of A.
//!
//! Line states are 2-bit values, A in bit 0 and B in bit 1, so they can be
//! shifted straight onto two consecutive pins.
//!
//! ```text
//! start:  A low, B falls four times, A rises
//! bits:   (A1,B=b1) (A0,B=b1) (A=b2,B1) (A=b2,B0)   per bit pair
//! end:    A falls twice while B stays low
//! ```

use crate::bus::Received;

/// Both lines high
pub const IDLE: u8 = 0b11;

/// Line states packed into one transmit FIFO word
pub const STATES_PER_WORD: usize = 16;

/// Largest packet in bytes: 256 words plus the check byte
pub const MAX_PACKET_BYTES: usize = 256 * 4 + 1;

const fn state(a: bool, b: bool) -> u8 {
    (a as u8) | ((b as u8) << 1)
}

const START_SEQUENCE: [u8; 9] = [
    state(false, true),
    state(false, false),
    state(false, true),
    state(false, false),
    state(false, true),
    state(false, false),
    state(false, true),
    state(false, false),
    state(true, false),
];

const END_SEQUENCE: [u8; 5] = [
    state(true, false),
    state(false, false),
    state(true, false),
    state(false, false),
    IDLE,
];

/// Emit the line states for one packet, in transmit order
pub fn encode_states(words: &[u32], crc: u8, mut emit: impl FnMut(u8)) {
    START_SEQUENCE.iter().for_each(|&s| emit(s));

    let mut emit_byte = |byte: u8| {
        for pair in 0..4 {
            let b1 = byte & (0x80 >> (pair * 2)) != 0;
            let b2 = byte & (0x40 >> (pair * 2)) != 0;
            emit(state(true, b1));
            emit(state(false, b1));
            emit(state(b2, true));
            emit(state(b2, false));
        }
    };
    for word in words {
        word.to_be_bytes().iter().for_each(|&b| emit_byte(b));
    }
    emit_byte(crc);

    END_SEQUENCE.iter().for_each(|&s| emit(s));
}

/// Pack the line states for one packet into FIFO words
///
/// State `n` of a word occupies bits `2n..2n+2`, matching a right-shifting
/// output register. The final word is padded with idle states. Returns the
/// number of words emitted.
pub fn encode_packet(words: &[u32], crc: u8, mut emit: impl FnMut(u32)) -> usize {
    let mut acc = 0u32;
    let mut filled = 0;
    let mut count = 0;

    encode_states(words, crc, |s| {
        acc |= (s as u32) << (filled * 2);
        filled += 1;
        if filled == STATES_PER_WORD {
            emit(acc);
            count += 1;
            acc = 0;
            filled = 0;
        }
    });

    if filled > 0 {
        for pad in filled..STATES_PER_WORD {
            acc |= (IDLE as u32) << (pad * 2);
        }
        emit(acc);
        count += 1;
    }
    count
}

/// Decoder errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Packet longer than [`MAX_PACKET_BYTES`]
    Overflow,
    /// End sequence arrived part way through a byte
    Misaligned,
    /// Both lines fell at once, or B fell twice in a row
    Glitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for four B falls with A held low
    Idle { b_falls: u8 },
    /// Clocking bits; remembers which line fell last
    Data { last_fall_a: bool },
}

/// Rebuilds packet bytes from sampled line states
pub struct PhaseDecoder {
    prev: u8,
    phase: Phase,
    pending: Option<bool>,
    current: u8,
    bits: u8,
    bytes: [u8; MAX_PACKET_BYTES],
    len: usize,
}

impl Default for PhaseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseDecoder {
    /// Create a decoder that assumes an idle line
    pub const fn new() -> Self {
        Self {
            prev: IDLE,
            phase: Phase::Idle { b_falls: 0 },
            pending: None,
            current: 0,
            bits: 0,
            bytes: [0; MAX_PACKET_BYTES],
            len: 0,
        }
    }

    /// Forget any partial packet
    pub fn reset(&mut self) {
        self.phase = Phase::Idle { b_falls: 0 };
        self.pending = None;
        self.current = 0;
        self.bits = 0;
        self.len = 0;
    }

    /// Returns true when no packet is being clocked in
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle { .. })
    }

    /// Feed one sampled line state
    ///
    /// Repeated states are ignored. Returns `Some(Ok(len))` when a packet of
    /// `len` bytes has been completed; the bytes stay available through
    /// [`PhaseDecoder::bytes`] until the next start sequence.
    pub fn feed(&mut self, sample: u8) -> Option<Result<usize, DecodeError>> {
        let sample = sample & IDLE;
        let prev = core::mem::replace(&mut self.prev, sample);
        if sample == prev {
            return None;
        }

        let a_fell = prev & 0b01 != 0 && sample & 0b01 == 0;
        let b_fell = prev & 0b10 != 0 && sample & 0b10 == 0;
        let a = sample & 0b01 != 0;
        let b = sample & 0b10 != 0;

        match self.phase {
            Phase::Idle { b_falls } => {
                if b_fell && !a {
                    let b_falls = b_falls + 1;
                    if b_falls == 4 {
                        self.len = 0;
                        self.current = 0;
                        self.bits = 0;
                        self.pending = None;
                        self.phase = Phase::Data { last_fall_a: false };
                    } else {
                        self.phase = Phase::Idle { b_falls };
                    }
                } else if a_fell || b_fell {
                    self.phase = Phase::Idle { b_falls: 0 };
                }
                None
            }
            Phase::Data { last_fall_a } => {
                if a_fell && b_fell {
                    self.reset();
                    return Some(Err(DecodeError::Glitch));
                }
                if a_fell {
                    if last_fall_a {
                        // Second A fall in a row: end of packet. The bit
                        // latched by the first one belongs to the end sequence.
                        self.pending = None;
                        self.phase = Phase::Idle { b_falls: 0 };
                        return Some(if self.bits == 0 {
                            Ok(self.len)
                        } else {
                            Err(DecodeError::Misaligned)
                        });
                    }
                    self.phase = Phase::Data { last_fall_a: true };
                    return self.latch(b);
                }
                if b_fell {
                    if !last_fall_a {
                        self.reset();
                        return Some(Err(DecodeError::Glitch));
                    }
                    self.phase = Phase::Data { last_fall_a: false };
                    return self.latch(a);
                }
                None
            }
        }
    }

    /// Bytes of the last completed packet
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn latch(&mut self, bit: bool) -> Option<Result<usize, DecodeError>> {
        let Some(committed) = self.pending.replace(bit) else {
            return None;
        };

        self.current = (self.current << 1) | committed as u8;
        self.bits += 1;
        if self.bits == 8 {
            if self.len == MAX_PACKET_BYTES {
                self.reset();
                return Some(Err(DecodeError::Overflow));
            }
            self.bytes[self.len] = self.current;
            self.len += 1;
            self.current = 0;
            self.bits = 0;
        }
        None
    }
}

/// Split packet bytes into big-endian words and the trailing check byte
///
/// Returns `None` unless the byte count is a whole number of words plus one
/// and the words fit `words`.
pub fn unpack_packet(bytes: &[u8], words: &mut [u32]) -> Option<Received> {
    let (&crc, body) = bytes.split_last()?;
    if body.len() % 4 != 0 || body.len() / 4 > words.len() {
        return None;
    }

    for (chunk, word) in body.chunks_exact(4).zip(words.iter_mut()) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(Received {
        len: body.len() / 4,
        crc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(words: &[u32], crc: u8) -> (PhaseDecoder, Option<Result<usize, DecodeError>>) {
        let mut decoder = PhaseDecoder::new();
        let mut result = None;
        encode_states(words, crc, |s| {
            if let Some(r) = decoder.feed(s) {
                result = Some(r);
            }
        });
        (decoder, result)
    }

    #[test]
    fn test_start_sequence_has_four_b_falls() {
        let mut states = [0u8; 9];
        let mut i = 0;
        encode_states(&[], 0, |s| {
            if i < 9 {
                states[i] = s;
                i += 1;
            }
        });
        assert_eq!(states, START_SEQUENCE);
    }

    #[test]
    fn test_packet_decodes() {
        let (decoder, result) = decode(&[0x0100_2009, 0x0000_0001], 0x29);
        assert_eq!(result, Some(Ok(9)));
        assert_eq!(
            decoder.bytes(),
            &[0x01, 0x00, 0x20, 0x09, 0x00, 0x00, 0x00, 0x01, 0x29]
        );

        let mut words = [0u32; 4];
        let rx = unpack_packet(decoder.bytes(), &mut words).unwrap();
        assert_eq!(rx, Received { len: 2, crc: 0x29 });
        assert_eq!(&words[..2], &[0x0100_2009, 0x0000_0001]);
    }

    #[test]
    fn test_idle_noise_is_ignored() {
        let mut decoder = PhaseDecoder::new();
        // A pulses while B is high: not a start sequence
        for s in [0b10, 0b11, 0b10, 0b11] {
            assert_eq!(decoder.feed(s), None);
        }
        let mut result = None;
        encode_states(&[0x0000_2001], 0x21, |s| {
            if let Some(r) = decoder.feed(s) {
                result = Some(r);
            }
        });
        assert_eq!(result, Some(Ok(5)));
    }

    #[test]
    fn test_simultaneous_fall_is_a_glitch() {
        let mut decoder = PhaseDecoder::new();
        for &s in START_SEQUENCE.iter() {
            decoder.feed(s);
        }
        decoder.feed(IDLE);
        assert_eq!(decoder.feed(0b00), Some(Err(DecodeError::Glitch)));
    }

    #[test]
    fn test_encode_packet_pads_with_idle() {
        let mut out = [0u32; 64];
        let mut n = 0;
        let count = encode_packet(&[], 0xFF, |w| {
            out[n] = w;
            n += 1;
        });
        // 9 start + 16 data + 5 end = 30 states
        assert_eq!(count, 2);
        assert_eq!(out[1] >> 28, 0b1111);
    }

    #[test]
    fn test_unpack_rejects_partial_words() {
        let mut words = [0u32; 4];
        assert_eq!(unpack_packet(&[1, 2, 3], &mut words), None);
        assert_eq!(unpack_packet(&[], &mut words), None);
        assert_eq!(unpack_packet(&[0x55], &mut words), Some(Received { len: 0, crc: 0x55 }));
    }

    proptest! {
        #[test]
        fn prop_encoded_packets_decode(
            words in proptest::collection::vec(any::<u32>(), 0..16),
            crc in any::<u8>(),
        ) {
            let (decoder, result) = decode(&words, crc);
            prop_assert_eq!(result, Some(Ok(words.len() * 4 + 1)));

            let mut out = [0u32; 16];
            let rx = unpack_packet(decoder.bytes(), &mut out).unwrap();
            prop_assert_eq!(rx.len, words.len());
            prop_assert_eq!(rx.crc, crc);
            prop_assert_eq!(&out[..words.len()], &words[..]);
        }
    }
}
