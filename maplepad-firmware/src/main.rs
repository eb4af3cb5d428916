//! Maplepad - Dreamcast controller and VMU firmware
//!
//! Main firmware binary for RP2040 boards wired to a controller port.
//! Presents a controller with a Visual Memory unit in its first expansion
//! slot (and optionally a rumble pack in the second), keeps the memory card
//! in the top of flash and mirrors the VMU LCD onto an SSD1331 OLED.
//!
//! Core 0 boots, loads the card and then only commits card writes to flash.
//! Core 1 formats a blank card, then answers the bus and drives the display.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::{PIO0, SPI1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::spi::{Blocking, Config as SpiConfig, Spi};
use embassy_time::{Delay, Instant};
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use maplepad_core::config::DeviceConfig;
use maplepad_core::peripheral::function::screen::{SCREEN_HEIGHT, SCREEN_WIDTH};
use maplepad_core::peripheral::function::{
    buttons, Controller, Function, Screen, Storage, Timer, Vibration,
};
use maplepad_core::peripheral::{AssemblyError, MainPeripheral, Peripheral};
use maplepad_core::scheduler::BusScheduler;
use maplepad_core::storage::card::CARD_SIZE;
use maplepad_core::storage::BlockStore;
use maplepad_display::{DisplayPipeline, PanelSink};
use maplepad_drivers::panel::Ssd1331;
use maplepad_hal_rp2040::flash::{blocking_flash, top_region};
use maplepad_hal_rp2040::maple::PioMapleBus;
use maplepad_protocol::{Address, StatusEvent};

use crate::input::ButtonPad;
use crate::tasks::Card;

mod callbacks;
mod channels;
mod config;
mod input;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// OLED SPI clock
const PANEL_SPI_HZ: u32 = 16_000_000;

type PanelSpi = ExclusiveDevice<Spi<'static, SPI1, Blocking>, Output<'static>, Delay>;
type Panel = Ssd1331<PanelSpi, Output<'static>, Output<'static>, Delay>;

// Core 1 stack; holds the scheduler buffers and the display framebuffer
static CORE1_STACK: ConstStaticCell<Stack<32768>> = ConstStaticCell::new(Stack::new());

// RAM shadow of the memory card
static CARD_SHADOW: ConstStaticCell<[u8; CARD_SIZE]> = ConstStaticCell::new([0; CARD_SIZE]);

static CARD: StaticCell<Card> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Maplepad firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();

    // Memory card: top 128 KiB of flash, shadowed in RAM
    let card: &'static Card = CARD.init(unwrap!(BlockStore::new(
        blocking_flash(p.FLASH),
        CARD_SHADOW.take(),
        top_region(CARD_SIZE),
        config.storage.settle_ms as u64,
    )));
    unwrap!(card.load());
    info!("Card loaded ({} bytes)", card.len());

    // Controller buttons (active low)
    let pad = ButtonPad::new([
        (Input::new(p.PIN_2, Pull::Up), buttons::A),
        (Input::new(p.PIN_3, Pull::Up), buttons::B),
        (Input::new(p.PIN_4, Pull::Up), buttons::X),
        (Input::new(p.PIN_5, Pull::Up), buttons::Y),
        (Input::new(p.PIN_6, Pull::Up), buttons::START),
        (Input::new(p.PIN_16, Pull::Up), buttons::UP),
        (Input::new(p.PIN_17, Pull::Up), buttons::DOWN),
        (Input::new(p.PIN_18, Pull::Up), buttons::LEFT),
        (Input::new(p.PIN_19, Pull::Up), buttons::RIGHT),
    ]);

    // Pin assignments: SDCKA=GPIO10, SDCKB=GPIO11, bus buffer DIR=GPIO12,
    // OLED CS=GPIO13, SCK=GPIO14, MOSI=GPIO15, DC=GPIO8, RST=GPIO9
    let (pio0, sdcka, sdckb, bus_dir) = (p.PIO0, p.PIN_10, p.PIN_11, p.PIN_12);
    let (spi1, sck, mosi, cs, dc, rst) = (p.SPI1, p.PIN_14, p.PIN_15, p.PIN_13, p.PIN_8, p.PIN_9);

    spawn_core1(p.CORE1, CORE1_STACK.take(), move || {
        let Pio {
            mut common,
            sm0,
            sm1,
            ..
        } = Pio::new(pio0, Irqs);
        let bus = PioMapleBus::new(&mut common, sm0, sm1, sdcka, sdckb, bus_dir);
        info!("Maple bus on PIO0");

        let mut spi_config = SpiConfig::default();
        spi_config.frequency = PANEL_SPI_HZ;
        let spi = Spi::new_blocking_txonly(spi1, sck, mosi, spi_config);
        let spi = unwrap!(ExclusiveDevice::new(spi, Output::new(cs, Level::High), Delay).ok());
        let panel: Panel = Ssd1331::new(
            spi,
            Output::new(dc, Level::Low),
            Output::new(rst, Level::High),
            Delay,
        );

        let mut display = DisplayPipeline::new(
            panel,
            config.display.color,
            config.display.overlay_ms as u64,
        );
        match display.initialize().and_then(|_| display.show_splash()) {
            Ok(()) => info!("Display ready"),
            Err(e) => warn!("Display unavailable: {}", e),
        }

        format_if_blank(card, &mut display);

        let root = unwrap!(build_tree(&config, card));
        let scheduler = BusScheduler::new(bus, root);
        tasks::bus_loop(scheduler, display, pad)
    });

    spawner.spawn(tasks::flush_task(card)).unwrap();
    info!("Cores running");
}

/// Write the empty filesystem to a card that has none
///
/// Runs on core 1 and blocks until core 0's flush task has committed every
/// sector.
fn format_if_blank<S: PanelSink>(card: &'static Card, display: &mut DisplayPipeline<S>) {
    let storage = Storage::new(card);
    if storage.is_formatted() {
        return;
    }

    warn!("Card has no filesystem, formatting");
    let now_ms = Instant::now().as_millis();
    let event = match storage.format(now_ms) {
        Ok(()) => {
            info!("Card formatted");
            StatusEvent::CardFormatted
        }
        Err(e) => {
            error!("Card format failed: {}", e);
            StatusEvent::SaveFailed
        }
    };
    if let Err(e) = display.notify(event.to_byte(), now_ms) {
        warn!("Display: {}", e);
    }
}

/// Controller on the main peripheral, VMU in slot 0, rumble pack in slot 1
fn build_tree(
    config: &DeviceConfig,
    card: &'static Card,
) -> Result<MainPeripheral<'static>, AssemblyError> {
    let mut root = MainPeripheral::new(config.controller.clone());
    root.add_function(Function::Controller(Controller::new()))?;

    let mut vmu = Peripheral::new(
        Address::sub(0).ok_or(AssemblyError::InvalidAddress)?,
        config.vmu.clone(),
    );
    vmu.add_function(Function::Storage(Storage::new(card)))?;
    vmu.add_function(Function::Screen(Screen::new(
        callbacks::on_screen,
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
    )))?;
    vmu.add_function(Function::Timer(Timer::new(
        Some(callbacks::on_set_time),
        Some(callbacks::on_pwm),
    )))?;
    root.add_sub_peripheral(vmu)?;

    if config.vibration.enabled {
        let mut rumble = Peripheral::new(
            Address::sub(1).ok_or(AssemblyError::InvalidAddress)?,
            config.vibration.identity.clone(),
        );
        rumble.add_function(Function::Vibration(Vibration::new(Some(
            callbacks::on_vibration,
        ))))?;
        root.add_sub_peripheral(rumble)?;
    }

    Ok(root)
}
