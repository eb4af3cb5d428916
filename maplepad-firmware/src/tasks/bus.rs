//! Core 1 loop: bus scheduler and display
//!
//! Never yields. Each pass answers at most one packet, then gives the
//! display a chance to pick up a new screen frame or status byte.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_time::Instant;

use maplepad_core::scheduler::{BusScheduler, TickOutcome};
use maplepad_display::{DisplayPipeline, PanelSink};
use maplepad_hal_rp2040::MapleBus;
use maplepad_protocol::StatusEvent;

use crate::channels::{BUS_SERVED, SCREEN_FRAME, STATUS};
use crate::input::ButtonPad;

/// Console silence after which the host counts as gone
const HOST_TIMEOUT_US: u64 = 1_000_000;

/// Tracks whether the console is polling us
#[derive(Default)]
struct HostLink {
    last_seen_us: Option<u64>,
}

impl HostLink {
    /// A request was served; reports the first one after a silence
    fn seen(&mut self, now_us: u64) -> Option<StatusEvent> {
        let first = self.last_seen_us.is_none();
        self.last_seen_us = Some(now_us);
        first.then_some(StatusEvent::HostConnected)
    }

    fn check(&mut self, now_us: u64) -> Option<StatusEvent> {
        match self.last_seen_us {
            Some(seen) if now_us.saturating_sub(seen) > HOST_TIMEOUT_US => {
                self.last_seen_us = None;
                Some(StatusEvent::HostLost)
            }
            _ => None,
        }
    }
}

pub fn bus_loop<B: MapleBus, S: PanelSink>(
    mut scheduler: BusScheduler<'static, B>,
    mut display: DisplayPipeline<S>,
    pad: ButtonPad,
) -> ! {
    info!("Bus loop started on core 1");

    let mut link = HostLink::default();

    loop {
        let now = Instant::now();
        let now_us = now.as_micros();
        let now_ms = now.as_millis();

        if let Some(controller) = scheduler.root_mut().controller_mut() {
            controller.set_state(pad.sample());
        }

        let mut event = None;
        match scheduler.tick(now_us) {
            TickOutcome::Idle | TickOutcome::Ignored { .. } => {}
            TickOutcome::Served { command, response } => {
                trace!("Served {=u8:#x} -> {=u8:#x}", command, response);
                BUS_SERVED.fetch_add(1, Ordering::Relaxed);
                event = link.seen(now_us);
            }
            TickOutcome::ProtocolError(e) => debug!("Bad packet: {}", e),
            TickOutcome::SendFailed(e) => warn!("Reply not sent: {}", e),
        }
        if let Some(event) = event.or_else(|| link.check(now_us)) {
            info!("Host: {}", event);
            report(display.notify(event.to_byte(), now_ms));
        }

        if let Some(frame) = SCREEN_FRAME.try_take() {
            report(display.draw_screen(&frame, now_ms));
        }
        while let Ok(status) = STATUS.try_receive() {
            report(display.notify(status, now_ms));
        }
        report(display.service(now_ms).map(|_| ()));
    }
}

fn report(result: Result<(), maplepad_display::DisplayError>) {
    if let Err(e) = result {
        warn!("Display: {}", e);
    }
}
