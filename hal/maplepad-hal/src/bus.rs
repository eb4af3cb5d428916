//! Maple bus transport abstraction
//!
//! A transport moves whole packets: header and payload words plus the
//! trailing check byte. Bit timing, line direction and framing are the
//! implementation's business.

/// Transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The line was not idle when a write was attempted
    Busy,
    /// Transmission did not finish in time
    Timeout,
    /// Packet exceeds the transport's buffer
    Overflow,
}

/// A packet received into a caller buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Received {
    /// Number of words written into the buffer
    pub len: usize,
    /// Check byte that followed the words
    pub crc: u8,
}

/// Packet-level Maple bus transport
pub trait MapleBus {
    /// Transmit `words` followed by `crc`
    ///
    /// Blocks until the packet has left the wire.
    fn write(&mut self, words: &[u32], crc: u8) -> Result<(), BusError>;

    /// Poll for a received packet
    ///
    /// Returns `None` if no complete packet is available. Never blocks for
    /// longer than it takes to drain the receiver.
    fn read(&mut self, buf: &mut [u32]) -> Option<Received>;

    /// Send a packet and wait for the reply
    ///
    /// Polls the receiver at most `polls` times. Any failure, including a
    /// silent bus, is reported as `None`.
    fn send_receive(
        &mut self,
        words: &[u32],
        crc: u8,
        response: &mut [u32],
        polls: u32,
    ) -> Option<Received> {
        self.write(words, crc).ok()?;
        (0..polls).find_map(|_| self.read(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loops every written packet back after a number of empty polls
    struct Loopback {
        sent: [u32; 4],
        len: usize,
        crc: u8,
        delay: u32,
        fail_writes: bool,
    }

    impl MapleBus for Loopback {
        fn write(&mut self, words: &[u32], crc: u8) -> Result<(), BusError> {
            if self.fail_writes {
                return Err(BusError::Busy);
            }
            self.sent[..words.len()].copy_from_slice(words);
            self.len = words.len();
            self.crc = crc;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u32]) -> Option<Received> {
            if self.delay > 0 {
                self.delay -= 1;
                return None;
            }
            buf[..self.len].copy_from_slice(&self.sent[..self.len]);
            Some(Received {
                len: self.len,
                crc: self.crc,
            })
        }
    }

    #[test]
    fn test_send_receive_waits_for_reply() {
        let mut bus = Loopback {
            sent: [0; 4],
            len: 0,
            crc: 0,
            delay: 3,
            fail_writes: false,
        };
        let mut response = [0u32; 4];
        let rx = bus.send_receive(&[0x0000_2001], 0x21, &mut response, 10);

        assert_eq!(rx, Some(Received { len: 1, crc: 0x21 }));
        assert_eq!(response[0], 0x0000_2001);
    }

    #[test]
    fn test_send_receive_gives_up() {
        let mut bus = Loopback {
            sent: [0; 4],
            len: 0,
            crc: 0,
            delay: 50,
            fail_writes: false,
        };
        let mut response = [0u32; 4];
        assert_eq!(bus.send_receive(&[1], 1, &mut response, 10), None);
    }

    #[test]
    fn test_send_receive_write_failure_is_no_response() {
        let mut bus = Loopback {
            sent: [0; 4],
            len: 0,
            crc: 0,
            delay: 0,
            fail_writes: true,
        };
        let mut response = [0u32; 4];
        assert_eq!(bus.send_receive(&[1], 1, &mut response, 10), None);
    }
}
