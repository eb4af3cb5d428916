//! Write-through card store with deferred flash commits
//!
//! The bus answers within microseconds while a flash sector erase takes
//! tens of milliseconds, so the card lives in a RAM shadow and flash is
//! brought up to date by a separate context calling [`BlockStore::process`]
//! in a loop.
//!
//! Locking:
//! - the shadow and the commit queue sit behind one critical-section mutex,
//!   held only to copy bytes in or out
//! - the flash device sits behind its own mutex, taken with `try_lock` by
//!   whichever context commits; no critical section is held across an erase
//!   or program

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embedded_storage::nor_flash::{NorFlash, NorFlashError, ReadNorFlash};
use heapless::Deque;

use maplepad_hal::{FlashError, FlashRegion};

use super::{CardMemory, StorageError};

/// Flash erase unit the store commits in
pub const SECTOR_SIZE: usize = 4096;

/// Largest card the commit queue can track
pub const MAX_SECTORS: usize = 32;

/// Chunk size used when loading the shadow from flash
const LOAD_CHUNK: usize = 256;

/// A sector waiting to be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    sector: usize,
    queued_at: u64,
    last_write: u64,
    /// Skip the settle window (format)
    urgent: bool,
}

struct State<'a> {
    shadow: &'a mut [u8],
    queue: Deque<Pending, MAX_SECTORS>,
    in_flight: Option<usize>,
    last_activity_ms: u64,
    failures: u32,
    last_error: Option<StorageError>,
}

impl State<'_> {
    fn enqueue(&mut self, sector: usize, now_ms: u64, urgent: bool) -> Result<(), StorageError> {
        if let Some(p) = self.queue.iter_mut().find(|p| p.sector == sector) {
            p.last_write = now_ms;
            p.urgent |= urgent;
            return Ok(());
        }
        self.queue
            .push_back(Pending {
                sector,
                queued_at: now_ms,
                last_write: now_ms,
                urgent,
            })
            .map_err(|_| StorageError::QueueFull)
    }
}

/// Card store shared between the bus context and the commit context
pub struct BlockStore<'a, F> {
    flash: Mutex<CriticalSectionRawMutex, F>,
    state: BlockingMutex<CriticalSectionRawMutex, RefCell<State<'a>>>,
    region: FlashRegion,
    settle_ms: u64,
}

impl<'a, F: NorFlash> BlockStore<'a, F> {
    /// Create a store over `region` of `flash`
    ///
    /// `shadow` must be exactly the region size. Sectors are committed once
    /// no write has touched them for `settle_ms`, so a burst of block writes
    /// into one sector costs a single erase.
    pub fn new(
        flash: F,
        shadow: &'a mut [u8],
        region: FlashRegion,
        settle_ms: u64,
    ) -> Result<Self, StorageError> {
        if F::ERASE_SIZE != SECTOR_SIZE
            || SECTOR_SIZE % F::WRITE_SIZE != 0
            || !region.is_aligned(SECTOR_SIZE as u32)
            || shadow.len() != region.size as usize
            || shadow.len() > SECTOR_SIZE * MAX_SECTORS
        {
            return Err(StorageError::Geometry);
        }

        Ok(Self {
            flash: Mutex::new(flash),
            state: BlockingMutex::new(RefCell::new(State {
                shadow,
                queue: Deque::new(),
                in_flight: None,
                last_activity_ms: 0,
                failures: 0,
                last_error: None,
            })),
            region,
            settle_ms,
        })
    }

    /// Card size in bytes
    pub fn len(&self) -> usize {
        self.region.size as usize
    }

    /// Returns true for a zero-sized card
    pub fn is_empty(&self) -> bool {
        self.region.size == 0
    }

    /// Fill the shadow from flash
    ///
    /// Called once at startup, before any writes.
    pub fn load(&self) -> Result<(), StorageError> {
        let mut flash = self.flash.try_lock().map_err(|_| StorageError::Busy)?;
        let mut chunk = [0u8; LOAD_CHUNK];

        for offset in (0..self.len()).step_by(LOAD_CHUNK) {
            flash
                .read(self.region.offset + offset as u32, &mut chunk)
                .map_err(flash_error)?;
            self.state.lock(|s| {
                s.borrow_mut().shadow[offset..offset + LOAD_CHUNK].copy_from_slice(&chunk);
            });
        }
        Ok(())
    }

    /// Read the latest card contents, including uncommitted writes
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let end = self.check_range(offset, buf.len())?;
        self.state.lock(|s| {
            buf.copy_from_slice(&s.borrow().shadow[offset..end]);
        });
        Ok(())
    }

    /// Update the shadow and queue the touched sectors
    ///
    /// Returns immediately; flash is written later by [`BlockStore::process`].
    pub fn write(&self, offset: usize, data: &[u8], now_ms: u64) -> Result<(), StorageError> {
        let end = self.check_range(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            s.shadow[offset..end].copy_from_slice(data);
            for sector in offset / SECTOR_SIZE..=(end - 1) / SECTOR_SIZE {
                s.enqueue(sector, now_ms, false)?;
            }
            s.last_activity_ms = now_ms;
            Ok(())
        })
    }

    /// Commit the oldest queued sector if it has settled
    ///
    /// Returns the committed sector index, or `None` if nothing was ready.
    /// A failed commit stays at the head of the queue and is retried on the
    /// next call.
    pub fn process(&self, now_ms: u64) -> Result<Option<usize>, StorageError> {
        self.commit_next(now_ms, false)
    }

    /// Replace the shadow with the image from `fill` and queue every sector
    ///
    /// Returns the failure count to pass to [`BlockStore::wait_committed`].
    pub fn reset(&self, fill: fn(&mut [u8]), now_ms: u64) -> Result<u32, StorageError> {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            fill(&mut *s.shadow);
            s.queue.clear();
            for sector in 0..self.len() / SECTOR_SIZE {
                s.enqueue(sector, now_ms, true)?;
            }
            s.last_activity_ms = now_ms;
            Ok(s.failures)
        })
    }

    /// Spin until every queued sector is on flash
    ///
    /// Another context must be calling [`BlockStore::process`]. Fails with
    /// the commit error as soon as a commit fails after `baseline` failures.
    pub fn wait_committed(&self, baseline: u32) -> Result<(), StorageError> {
        loop {
            let done = self.state.lock(|s| {
                let s = s.borrow();
                if s.failures > baseline {
                    return Some(Err(s.last_error.unwrap_or(StorageError::Flash(FlashError::Device))));
                }
                if s.queue.is_empty() && s.in_flight.is_none() {
                    return Some(Ok(()));
                }
                None
            });
            if let Some(result) = done {
                return result;
            }
            core::hint::spin_loop();
        }
    }

    /// Commit everything in the calling context, ignoring the settle window
    ///
    /// Used before the commit context is running. Returns the number of
    /// sectors written.
    pub fn flush_all(&self, now_ms: u64) -> Result<usize, StorageError> {
        let mut committed = 0;
        while self.pending() > 0 {
            match self.commit_next(now_ms, true)? {
                Some(_) => committed += 1,
                None => core::hint::spin_loop(),
            }
        }
        Ok(committed)
    }

    /// Sectors queued or being written
    pub fn pending(&self) -> usize {
        self.state.lock(|s| {
            let s = s.borrow();
            s.queue.len() + s.in_flight.is_some() as usize
        })
    }

    /// Timestamp of the last write or commit
    pub fn last_activity_time(&self) -> u64 {
        self.state.lock(|s| s.borrow().last_activity_ms)
    }

    /// Most recent commit failure
    pub fn last_error(&self) -> Option<StorageError> {
        self.state.lock(|s| s.borrow().last_error)
    }

    /// Total commit failures since startup
    pub fn failures(&self) -> u32 {
        self.state.lock(|s| s.borrow().failures)
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<usize, StorageError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(end),
            _ => Err(StorageError::OutOfRange),
        }
    }

    fn commit_next(&self, now_ms: u64, force: bool) -> Result<Option<usize>, StorageError> {
        // Only one context commits at a time
        let Ok(mut flash) = self.flash.try_lock() else {
            return Ok(None);
        };

        let mut buf = [0u8; SECTOR_SIZE];
        let job = self.state.lock(|s| {
            let mut s = s.borrow_mut();
            let head = *s.queue.front()?;
            let settled = head.urgent || now_ms.saturating_sub(head.last_write) >= self.settle_ms;
            if !force && !settled {
                return None;
            }
            s.queue.pop_front();
            s.in_flight = Some(head.sector);
            let start = head.sector * SECTOR_SIZE;
            buf.copy_from_slice(&s.shadow[start..start + SECTOR_SIZE]);
            Some(head)
        });
        let Some(job) = job else {
            return Ok(None);
        };

        let result = self
            .region
            .sector_range(job.sector, SECTOR_SIZE)
            .ok_or(StorageError::OutOfRange)
            .and_then(|range| {
                flash.erase(range.start, range.end).map_err(flash_error)?;
                flash.write(range.start, &buf).map_err(flash_error)
            });

        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            s.in_flight = None;
            match result {
                Ok(()) => {
                    s.last_activity_ms = now_ms;
                    Ok(Some(job.sector))
                }
                Err(e) => {
                    s.failures = s.failures.wrapping_add(1);
                    s.last_error = Some(e);
                    // Newer writes may have re-queued the sector already
                    if !s.queue.iter().any(|p| p.sector == job.sector) {
                        let _ = s.queue.push_front(job);
                    }
                    Err(e)
                }
            }
        })
    }
}

impl<F: NorFlash> CardMemory for BlockStore<'_, F> {
    fn len(&self) -> usize {
        BlockStore::len(self)
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        BlockStore::read(self, offset, buf)
    }

    fn write(&self, offset: usize, data: &[u8], now_ms: u64) -> Result<(), StorageError> {
        BlockStore::write(self, offset, data, now_ms)
    }

    fn format(&self, fill: fn(&mut [u8]), now_ms: u64) -> Result<(), StorageError> {
        let baseline = self.reset(fill, now_ms)?;
        self.wait_committed(baseline)
    }
}

fn flash_error<E: NorFlashError>(e: E) -> StorageError {
    StorageError::Flash(FlashError::from(e.kind()))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::storage::card::{self, blank_image, CARD_SIZE};
    use embedded_storage::nor_flash::{ErrorType, NorFlashErrorKind};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::vec;
    use std::vec::Vec;

    const BASE: u32 = 0x1000;

    /// RAM-backed flash; clones share the same bytes
    #[derive(Clone)]
    struct MockFlash {
        data: Arc<StdMutex<Vec<u8>>>,
        erases: Arc<AtomicU64>,
        fail: Arc<AtomicBool>,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: Arc::new(StdMutex::new(vec![0xFF; BASE as usize + CARD_SIZE])),
                erases: Arc::new(AtomicU64::new(0)),
                fail: Arc::new(AtomicBool::new(false)),
            }
        }

        fn card(&self) -> Vec<u8> {
            self.data.lock().unwrap()[BASE as usize..].to_vec()
        }
    }

    impl ErrorType for MockFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let data = self.data.lock().unwrap();
            let start = offset as usize;
            bytes.copy_from_slice(&data[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.lock().unwrap().len()
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 1;
        const ERASE_SIZE: usize = SECTOR_SIZE;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(NorFlashErrorKind::Other);
            }
            self.erases.fetch_add(1, Ordering::SeqCst);
            self.data.lock().unwrap()[from as usize..to as usize].fill(0xFF);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let mut data = self.data.lock().unwrap();
            let start = offset as usize;
            data[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    fn region() -> FlashRegion {
        FlashRegion {
            offset: BASE,
            size: CARD_SIZE as u32,
        }
    }

    #[test]
    fn test_rejects_mismatched_shadow() {
        let mut shadow = vec![0u8; CARD_SIZE / 2];
        assert!(matches!(
            BlockStore::new(MockFlash::new(), &mut shadow, region(), 0),
            Err(StorageError::Geometry)
        ));
    }

    #[test]
    fn test_write_is_visible_before_commit() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash.clone(), &mut shadow, region(), 50).unwrap();

        let data = [0xA5u8; 100];
        store.write(1000, &data, 0).unwrap();

        let mut out = [0u8; 100];
        store.read(1000, &mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(store.pending(), 1);
        // Nothing reached flash yet
        assert_eq!(flash.erases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(MockFlash::new(), &mut shadow, region(), 0).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(store.read(CARD_SIZE - 4, &mut buf), Err(StorageError::OutOfRange));
        assert_eq!(store.write(CARD_SIZE, &[1], 0), Err(StorageError::OutOfRange));
        assert_eq!(store.read(usize::MAX, &mut buf), Err(StorageError::OutOfRange));
    }

    #[test]
    fn test_commit_waits_for_settle_window() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash.clone(), &mut shadow, region(), 50).unwrap();

        store.write(0, &[1, 2, 3, 4], 100).unwrap();
        assert_eq!(store.process(120), Ok(None));

        // A second write to the same sector restarts the window
        store.write(512, &[5, 6, 7, 8], 140).unwrap();
        assert_eq!(store.process(160), Ok(None));
        assert_eq!(store.process(190), Ok(Some(0)));

        assert_eq!(flash.erases.load(Ordering::SeqCst), 1);
        let card = flash.card();
        assert_eq!(&card[..4], &[1, 2, 3, 4]);
        assert_eq!(&card[512..516], &[5, 6, 7, 8]);
        assert_eq!(store.pending(), 0);
        assert_eq!(store.last_activity_time(), 190);
    }

    #[test]
    fn test_commits_in_request_order() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash, &mut shadow, region(), 0).unwrap();

        store.write(5 * SECTOR_SIZE, &[1], 0).unwrap();
        store.write(2 * SECTOR_SIZE, &[2], 0).unwrap();
        store.write(9 * SECTOR_SIZE, &[3], 0).unwrap();

        assert_eq!(store.process(1), Ok(Some(5)));
        assert_eq!(store.process(1), Ok(Some(2)));
        assert_eq!(store.process(1), Ok(Some(9)));
        assert_eq!(store.process(1), Ok(None));
    }

    #[test]
    fn test_write_spanning_sectors_queues_both() {
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(MockFlash::new(), &mut shadow, region(), 0).unwrap();
        store.write(SECTOR_SIZE - 2, &[1, 2, 3, 4], 0).unwrap();
        assert_eq!(store.pending(), 2);
    }

    #[test]
    fn test_failed_commit_is_retried() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash.clone(), &mut shadow, region(), 0).unwrap();

        store.write(64, &[0x42], 0).unwrap();
        flash.fail.store(true, Ordering::SeqCst);
        assert_eq!(
            store.process(1),
            Err(StorageError::Flash(FlashError::Device))
        );
        assert_eq!(store.pending(), 1);
        assert_eq!(store.failures(), 1);

        flash.fail.store(false, Ordering::SeqCst);
        assert_eq!(store.process(2), Ok(Some(0)));
        assert_eq!(flash.card()[64], 0x42);
    }

    #[test]
    fn test_load_fills_shadow() {
        let flash = MockFlash::new();
        flash.data.lock().unwrap()[BASE as usize + 300] = 0x99;

        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash, &mut shadow, region(), 0).unwrap();
        store.load().unwrap();

        let mut out = [0u8; 2];
        store.read(299, &mut out).unwrap();
        assert_eq!(out, [0xFF, 0x99]);
    }

    #[test]
    fn test_format_after_drain_reads_blank_image() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash.clone(), &mut shadow, region(), 0).unwrap();

        store.write(0, &[0xEE; 512], 0).unwrap();
        store.flush_all(1).unwrap();
        assert_eq!(store.pending(), 0);

        let stop = AtomicBool::new(false);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    let _ = store.process(2);
                }
            });
            let result = CardMemory::format(&store, blank_image, 2);
            stop.store(true, Ordering::SeqCst);
            assert_eq!(result, Ok(()));
        });

        let mut expected = vec![0u8; CARD_SIZE];
        blank_image(&mut expected);

        let mut out = vec![0u8; CARD_SIZE];
        store.read(0, &mut out).unwrap();
        assert_eq!(out, expected);
        assert_eq!(flash.card(), expected);
        assert!(card::is_formatted(&out[card::block_offset(card::SYSTEM_BLOCK)..]));
    }

    #[test]
    fn test_format_reports_commit_failure() {
        let flash = MockFlash::new();
        flash.fail.store(true, Ordering::SeqCst);
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash, &mut shadow, region(), 0).unwrap();

        let stop = AtomicBool::new(false);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    let _ = store.process(0);
                }
            });
            let result = CardMemory::format(&store, blank_image, 0);
            stop.store(true, Ordering::SeqCst);
            assert_eq!(result, Err(StorageError::Flash(FlashError::Device)));
        });
    }

    #[test]
    fn test_concurrent_writes_commit_last_value() {
        let flash = MockFlash::new();
        let mut shadow = vec![0u8; CARD_SIZE];
        let store = BlockStore::new(flash.clone(), &mut shadow, region(), 0).unwrap();

        let block10 = 10 * card::BLOCK_SIZE;
        let block11 = 11 * card::BLOCK_SIZE;
        let clock = AtomicU64::new(0);
        let stop = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    let _ = store.process(clock.load(Ordering::SeqCst));
                }
            });

            for round in 0..200u32 {
                let now = clock.fetch_add(1, Ordering::SeqCst);
                let fill = (round % 251) as u8;
                store.write(block10, &[fill; card::BLOCK_SIZE], now).unwrap();
                store.write(block11, &[fill.wrapping_add(1); card::BLOCK_SIZE], now).unwrap();
            }
            stop.store(true, Ordering::SeqCst);
        });

        store.flush_all(clock.load(Ordering::SeqCst)).unwrap();

        let last = (199 % 251) as u8;
        let card = flash.card();
        assert!(card[block10..block10 + card::BLOCK_SIZE].iter().all(|&b| b == last));
        assert!(card[block11..block11 + card::BLOCK_SIZE]
            .iter()
            .all(|&b| b == last.wrapping_add(1)));
    }
}
