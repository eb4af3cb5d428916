//! Card commit task
//!
//! Drains the block store's queue onto flash. embassy-rp only allows flash
//! erase/program from core 0 (core 1 is parked in RAM meanwhile), so this is
//! the one thing core 0 does after boot.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_futures::yield_now;
use embassy_time::{Duration, Instant};

use maplepad_core::storage::BlockStore;
use maplepad_hal_rp2040::flash::BlockingFlash;
use maplepad_protocol::StatusEvent;

use crate::channels::{BUS_SERVED, STATUS};

/// The memory card as shared between the cores
pub type Card = BlockStore<'static, BlockingFlash<'static>>;

/// How often the task logs a heartbeat
const HEARTBEAT: Duration = Duration::from_secs(10);

#[embassy_executor::task]
pub async fn flush_task(card: &'static Card) {
    info!("Flush task started");

    let mut reported_failures = card.failures();
    let mut unsaved = false;
    let mut last_heartbeat = Instant::now();

    loop {
        match card.process(Instant::now().as_millis()) {
            Ok(Some(sector)) => {
                debug!("Sector {} committed", sector);
                unsaved = true;
            }
            Ok(None) => {}
            Err(e) => warn!("Card commit failed, will retry: {}", e),
        }

        let pending = card.pending();

        let failures = card.failures();
        if failures != reported_failures {
            reported_failures = failures;
            post(StatusEvent::SaveFailed);
        }
        if unsaved && pending == 0 {
            unsaved = false;
            post(StatusEvent::CardSaved);
        }

        if last_heartbeat.elapsed() >= HEARTBEAT {
            last_heartbeat = Instant::now();
            info!(
                "Heartbeat: {} requests served, {} sectors pending, {} commit failures",
                BUS_SERVED.load(Ordering::Relaxed),
                pending,
                failures
            );
        }

        if pending == 0 {
            yield_now().await;
        }
    }
}

/// Queue a status byte for the display; dropped if the display is behind
fn post(event: StatusEvent) {
    if STATUS.try_send(event.to_byte()).is_err() {
        debug!("Status {} dropped", event);
    }
}
