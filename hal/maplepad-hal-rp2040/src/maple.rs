//! PIO-based Maple bus transport
//!
//! Two state machines share the SDCKA/SDCKB pin pair (which must be
//! consecutive GPIOs, A first):
//!
//! - TX shifts pre-encoded 2-bit line states out of its FIFO, one state per
//!   instruction. Encoding happens in software (`maplepad_hal::phase`).
//! - RX samples both lines and pushes a state every time it changes; the
//!   phase decoder rebuilds the bytes.
//!
//! An external buffer direction pin is driven high while transmitting.

use embassy_rp::gpio::{Level, Output, Pin as GpioPin};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, FifoJoin, Instance, Pin, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;

use maplepad_hal::phase::{encode_packet, unpack_packet, PhaseDecoder};
use maplepad_hal::{BusError, MapleBus, Received};

use crate::pio::{clock_divider_bits, STATE_PERIOD_NS};

/// Spins allowed while waiting on the TX FIFO before giving up
const TX_SPIN_LIMIT: u32 = 100_000;

/// PIO Maple bus transport
pub struct PioMapleBus<'d, PIO: Instance, const TX: usize, const RX: usize> {
    tx: StateMachine<'d, PIO, TX>,
    rx: StateMachine<'d, PIO, RX>,
    sdcka: Pin<'d, PIO>,
    sdckb: Pin<'d, PIO>,
    dir: Output<'d>,
    decoder: PhaseDecoder,
}

impl<'d, PIO: Instance, const TX: usize, const RX: usize> PioMapleBus<'d, PIO, TX, RX> {
    /// Create the transport and start listening
    ///
    /// # Arguments
    /// * `common` - PIO common resources (for loading programs)
    /// * `tx` - State machine used for transmitting
    /// * `rx` - State machine used for receiving
    /// * `sdcka` - SDCKA line; SDCKB must be the next GPIO
    /// * `sdckb` - SDCKB line
    /// * `dir` - Bus buffer direction pin (high = drive the bus)
    pub fn new<A: PioPin, B: PioPin, DIR: GpioPin>(
        common: &mut Common<'d, PIO>,
        mut tx: StateMachine<'d, PIO, TX>,
        mut rx: StateMachine<'d, PIO, RX>,
        sdcka: Peri<'d, A>,
        sdckb: Peri<'d, B>,
        dir: Peri<'d, DIR>,
    ) -> Self {
        let tx_prg = pio::pio_asm!(
            ".wrap_target",
            "out pins, 2", // One line state per instruction
            ".wrap"
        );
        let rx_prg = pio::pio_asm!(
            ".wrap_target",
            "sample:",
            "mov isr, null",
            "in pins, 2",
            "mov y, isr",
            "jmp x!=y changed",
            "jmp sample",
            "changed:",
            "mov x, y",
            "push noblock", // Drop states rather than stall if software falls behind
            ".wrap"
        );
        let tx_installed = common.load_program(&tx_prg.program);
        let rx_installed = common.load_program(&rx_prg.program);

        let mut sdcka = common.make_pio_pin(sdcka);
        let mut sdckb = common.make_pio_pin(sdckb);
        sdcka.set_pull(embassy_rp::gpio::Pull::Up);
        sdckb.set_pull(embassy_rp::gpio::Pull::Up);

        let mut tx_cfg = Config::default();
        tx_cfg.use_program(&tx_installed, &[]);
        tx_cfg.set_out_pins(&[&sdcka, &sdckb]);
        tx_cfg.shift_out = ShiftConfig {
            threshold: 32,
            direction: ShiftDirection::Right,
            auto_fill: true,
        };
        tx_cfg.fifo_join = FifoJoin::TxOnly;
        tx_cfg.clock_divider = U24F8::from_bits(clock_divider_bits(STATE_PERIOD_NS));
        tx.set_config(&tx_cfg);

        let mut rx_cfg = Config::default();
        rx_cfg.use_program(&rx_installed, &[]);
        rx_cfg.set_in_pins(&[&sdcka, &sdckb]);
        rx_cfg.shift_in = ShiftConfig {
            threshold: 32,
            direction: ShiftDirection::Left,
            auto_fill: false,
        };
        rx_cfg.fifo_join = FifoJoin::RxOnly;
        rx_cfg.clock_divider = U24F8::from_bits(256);
        rx.set_config(&rx_cfg);

        rx.set_pin_dirs(PioDirection::In, &[&sdcka, &sdckb]);
        rx.set_enable(true);

        Self {
            tx,
            rx,
            sdcka,
            sdckb,
            dir: Output::new(dir, Level::Low),
            decoder: PhaseDecoder::new(),
        }
    }

    fn start_listening(&mut self) {
        self.tx.set_pin_dirs(PioDirection::In, &[&self.sdcka, &self.sdckb]);
        self.dir.set_low();
        self.decoder.reset();
        self.rx.clear_fifos();
        self.rx.restart();
        self.rx.set_enable(true);
    }
}

impl<'d, PIO: Instance, const TX: usize, const RX: usize> MapleBus for PioMapleBus<'d, PIO, TX, RX> {
    fn write(&mut self, words: &[u32], crc: u8) -> Result<(), BusError> {
        if !self.decoder.is_idle() {
            return Err(BusError::Busy);
        }

        self.rx.set_enable(false);
        self.dir.set_high();
        self.tx.set_pins(Level::High, &[&self.sdcka, &self.sdckb]);
        self.tx.set_pin_dirs(PioDirection::Out, &[&self.sdcka, &self.sdckb]);
        self.tx.clear_fifos();
        self.tx.restart();
        self.tx.set_enable(true);

        let mut result = Ok(());
        let tx = &mut self.tx;
        encode_packet(words, crc, |state_word| {
            if result.is_err() {
                return;
            }
            let mut spins = 0;
            while !tx.tx().try_push(state_word) {
                spins += 1;
                if spins > TX_SPIN_LIMIT {
                    result = Err(BusError::Timeout);
                    return;
                }
            }
        });

        // Autopull stalls once the last state has been shifted out
        let mut spins = 0;
        while result.is_ok() && !(self.tx.tx().empty() && self.tx.tx().stalled()) {
            spins += 1;
            if spins > TX_SPIN_LIMIT {
                result = Err(BusError::Timeout);
            }
        }

        self.tx.set_enable(false);
        self.start_listening();
        result
    }

    fn read(&mut self, buf: &mut [u32]) -> Option<Received> {
        while let Some(sample) = self.rx.rx().try_pull() {
            match self.decoder.feed(sample as u8) {
                Some(Ok(_)) => return unpack_packet(self.decoder.bytes(), buf),
                // Malformed packets are dropped; the console will retry
                Some(Err(_)) | None => {}
            }
        }
        None
    }
}
