//! Bus scheduler
//!
//! Runs one receive/dispatch/respond cycle per [`BusScheduler::tick`]. Ticks
//! are independent: nothing is retried and nothing carries over except the
//! running counters.

use maplepad_hal::{BusError, MapleBus};
use maplepad_protocol::{Frame, FrameError, ResponseCode, MAX_FRAME_WORDS};

use crate::peripheral::MainPeripheral;

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// No packet was waiting
    Idle,
    /// A request was answered
    Served { command: u8, response: u8 },
    /// The packet was addressed to a device outside this tree
    Ignored { recipient: u8 },
    /// The packet failed validation; a resend was requested if it was ours
    ProtocolError(FrameError),
    /// The response could not be transmitted
    SendFailed(BusError),
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    pub served: u32,
    pub protocol_errors: u32,
    pub ignored: u32,
    pub send_failures: u32,
}

/// Drives a peripheral tree from a transport
pub struct BusScheduler<'a, B> {
    bus: B,
    root: MainPeripheral<'a>,
    rx: [u32; MAX_FRAME_WORDS],
    tx: [u32; MAX_FRAME_WORDS],
    stats: BusStats,
}

impl<'a, B: MapleBus> BusScheduler<'a, B> {
    /// Take ownership of the tree; its shape is frozen from here on
    pub fn new(bus: B, mut root: MainPeripheral<'a>) -> Self {
        root.seal();
        Self {
            bus,
            root,
            rx: [0; MAX_FRAME_WORDS],
            tx: [0; MAX_FRAME_WORDS],
            stats: BusStats::default(),
        }
    }

    pub fn root(&self) -> &MainPeripheral<'a> {
        &self.root
    }

    /// Mutable access for feeding state (controller input) between ticks
    pub fn root_mut(&mut self) -> &mut MainPeripheral<'a> {
        &mut self.root
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Poll for one packet and answer it
    pub fn tick(&mut self, now_us: u64) -> TickOutcome {
        let Some(received) = self.bus.read(&mut self.rx) else {
            return TickOutcome::Idle;
        };
        let len = received.len.min(MAX_FRAME_WORDS);

        let request = match Frame::decode(&self.rx[..len], received.crc) {
            Ok(frame) => frame,
            Err(e) => {
                let header = (len > 0).then(|| self.rx[0]);
                return self.reject(e, header);
            }
        };

        let Some(response) = self.root.task(now_us, Some(&request)) else {
            self.stats.ignored = self.stats.ignored.wrapping_add(1);
            return TickOutcome::Ignored {
                recipient: request.recipient,
            };
        };

        match self.send(&response) {
            Ok(()) => {
                self.stats.served = self.stats.served.wrapping_add(1);
                TickOutcome::Served {
                    command: request.command,
                    response: response.command,
                }
            }
            Err(e) => TickOutcome::SendFailed(e),
        }
    }

    /// Count a malformed packet and ask for it again if it was for us
    fn reject(&mut self, error: FrameError, header: Option<u32>) -> TickOutcome {
        self.stats.protocol_errors = self.stats.protocol_errors.wrapping_add(1);

        if let Some(header) = header {
            let recipient = (header >> 8) as u8;
            let requester = (header >> 16) as u8;
            if let Some(sender) = self.root.reply_sender(recipient) {
                let resend = Frame::empty(ResponseCode::Resend.to_byte(), requester, sender);
                if let Err(e) = self.send(&resend) {
                    return TickOutcome::SendFailed(e);
                }
            }
        }
        TickOutcome::ProtocolError(error)
    }

    fn send(&mut self, frame: &Frame) -> Result<(), BusError> {
        let result = frame
            .encode(&mut self.tx)
            .map_err(|_| BusError::Overflow)
            .and_then(|(len, crc)| self.bus.write(&self.tx[..len], crc));
        if result.is_err() {
            self.stats.send_failures = self.stats.send_failures.wrapping_add(1);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::Identity;
    use crate::peripheral::function::{Controller, Function};
    use maplepad_hal::Received;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Scripted transport: queued inbound packets, recorded outbound ones
    #[derive(Default)]
    struct ScriptedBus {
        inbound: VecDeque<(Vec<u32>, u8)>,
        sent: Vec<(Vec<u32>, u8)>,
        fail_writes: bool,
    }

    impl ScriptedBus {
        fn push_frame(&mut self, frame: &Frame) {
            let mut buf = [0u32; MAX_FRAME_WORDS];
            let (len, crc) = frame.encode(&mut buf).unwrap();
            self.inbound.push_back((buf[..len].to_vec(), crc));
        }
    }

    impl MapleBus for ScriptedBus {
        fn write(&mut self, words: &[u32], crc: u8) -> Result<(), BusError> {
            if self.fail_writes {
                return Err(BusError::Timeout);
            }
            self.sent.push((words.to_vec(), crc));
            Ok(())
        }

        fn read(&mut self, buf: &mut [u32]) -> Option<Received> {
            let (words, crc) = self.inbound.pop_front()?;
            buf[..words.len()].copy_from_slice(&words);
            Some(Received {
                len: words.len(),
                crc,
            })
        }
    }

    fn scheduler(bus: ScriptedBus) -> BusScheduler<'static, ScriptedBus> {
        let mut root = MainPeripheral::new(Identity::controller());
        root.add_function(Function::Controller(Controller::new()))
            .unwrap();
        BusScheduler::new(bus, root)
    }

    #[test]
    fn test_idle_bus() {
        let mut s = scheduler(ScriptedBus::default());
        assert_eq!(s.tick(0), TickOutcome::Idle);
        assert_eq!(s.stats(), BusStats::default());
        assert!(s.root().is_sealed());
    }

    #[test]
    fn test_request_is_answered() {
        let mut bus = ScriptedBus::default();
        bus.push_frame(&Frame::empty(0x01, 0x20, 0x00));
        let mut s = scheduler(bus);

        assert_eq!(
            s.tick(0),
            TickOutcome::Served {
                command: 0x01,
                response: 0x05
            }
        );
        let (words, crc) = &s.bus_mut().sent[0];
        assert_eq!(words[0], 0x1C20_0005);
        assert_eq!(*crc, Frame::checksum(words));
        assert_eq!(s.stats().served, 1);
    }

    #[test]
    fn test_corrupt_packet_requests_resend() {
        let mut bus = ScriptedBus::default();
        let words = std::vec![0x0100_2009, 0x0000_0001];
        let crc = Frame::checksum(&words) ^ 0x01;
        bus.inbound.push_back((words, crc));
        let mut s = scheduler(bus);

        assert_eq!(
            s.tick(0),
            TickOutcome::ProtocolError(FrameError::InvalidChecksum)
        );
        let (reply, _) = &s.bus_mut().sent[0];
        assert_eq!(reply, &std::vec![0x0020_00FC]);
        assert_eq!(s.stats().protocol_errors, 1);
    }

    #[test]
    fn test_corrupt_packet_for_others_is_silent() {
        let mut bus = ScriptedBus::default();
        let words = std::vec![0x0100_0409, 0x0000_0001];
        bus.inbound.push_back((words, 0));
        let mut s = scheduler(bus);

        assert!(matches!(s.tick(0), TickOutcome::ProtocolError(_)));
        assert!(s.bus_mut().sent.is_empty());
    }

    #[test]
    fn test_foreign_packet_is_ignored() {
        let mut bus = ScriptedBus::default();
        bus.push_frame(&Frame::empty(0x01, 0x01, 0x00));
        let mut s = scheduler(bus);

        assert_eq!(s.tick(0), TickOutcome::Ignored { recipient: 0x01 });
        assert_eq!(s.stats().ignored, 1);
    }

    #[test]
    fn test_send_failure_is_counted() {
        let mut bus = ScriptedBus {
            fail_writes: true,
            ..Default::default()
        };
        bus.push_frame(&Frame::empty(0x01, 0x20, 0x00));
        let mut s = scheduler(bus);

        assert_eq!(s.tick(0), TickOutcome::SendFailed(BusError::Timeout));
        assert_eq!(s.stats().send_failures, 1);
        assert_eq!(s.stats().served, 0);
    }

    #[test]
    fn test_ticks_are_independent() {
        let mut bus = ScriptedBus::default();
        bus.inbound.push_back((std::vec![0x0200_2009], 0));
        bus.push_frame(&Frame::new(0x09, 0x20, 0x00, &[0x1]).unwrap());
        let mut s = scheduler(bus);

        assert!(matches!(
            s.tick(0),
            TickOutcome::ProtocolError(FrameError::LengthMismatch)
        ));
        assert_eq!(
            s.tick(1),
            TickOutcome::Served {
                command: 0x09,
                response: 0x08
            }
        );
    }
}
