//! Storage function: the VMU memory card
//!
//! Block addresses arrive as a location word,
//! `PARTITION << 24 | PHASE << 16 | BLOCK`. Reads return a whole block;
//! writes carry one quarter of a block per phase.

use maplepad_protocol::{pack_words, unpack_words, Command, FunctionCode, ResponseCode};

use super::{wrong_length, Reply};
use crate::storage::card::{
    self, BLOCK_COUNT, BLOCK_SIZE, MEDIA_INFO, PARTITIONS, PHASE_SIZE, READ_PHASES, WRITE_PHASES,
};
use crate::storage::{CardMemory, StorageError};

const BLOCK_WORDS: usize = BLOCK_SIZE / 4;
const PHASE_WORDS: usize = PHASE_SIZE / 4;

/// Decoded location word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    partition: u8,
    phase: u8,
    block: u16,
}

impl Location {
    fn from_word(word: u32) -> Self {
        Self {
            partition: (word >> 24) as u8,
            phase: (word >> 16) as u8,
            block: word as u16,
        }
    }

    fn is_valid(&self, phases: usize) -> bool {
        (self.partition as usize) < PARTITIONS
            && (self.phase as usize) < phases
            && (self.block as usize) < BLOCK_COUNT
    }
}

/// Storage function over a card memory
pub struct Storage<'a> {
    memory: &'a dyn CardMemory,
}

impl<'a> Storage<'a> {
    pub fn new(memory: &'a dyn CardMemory) -> Self {
        Self { memory }
    }

    /// Definition word: partitions, block size, read/write phases
    pub fn definition(&self) -> u32 {
        u32::from_be_bytes([
            (PARTITIONS - 1) as u8,
            (BLOCK_SIZE / 32 - 1) as u8,
            ((WRITE_PHASES as u8) << 4) | READ_PHASES as u8,
            0,
        ])
    }

    /// Returns true if the card carries a filesystem
    pub fn is_formatted(&self) -> bool {
        let mut signature = [0u8; 16];
        self.memory
            .read(card::block_offset(card::SYSTEM_BLOCK), &mut signature)
            .is_ok()
            && card::is_formatted(&signature)
    }

    /// Write the empty filesystem and wait until it is on flash
    ///
    /// Blocks until the commit context has flushed every sector.
    pub fn format(&self, now_ms: u64) -> Result<(), StorageError> {
        self.memory.format(card::blank_image, now_ms)
    }

    pub(super) fn handle(&mut self, command: Command, payload: &[u32], now_us: u64) -> Reply {
        match command {
            // function code, partition
            Command::GetMemoryInfo => wrong_length(payload, 2).unwrap_or_else(|| self.memory_info()),
            Command::BlockRead => self.block_read(payload),
            Command::BlockWrite => self.block_write(payload, now_us / 1000),
            Command::BlockCompleteWrite => wrong_length(payload, 2).unwrap_or(Reply::Ack),
            _ => Reply::Error(ResponseCode::UnknownCommand),
        }
    }

    fn memory_info(&self) -> Reply {
        let mut words = [0u32; MEDIA_INFO.len() / 2];
        for (word, pair) in words.iter_mut().zip(MEDIA_INFO.chunks(2)) {
            *word = (pair[0] as u32) << 16 | pair[1] as u32;
        }
        Reply::data(FunctionCode::Storage, &words)
    }

    fn block_read(&self, payload: &[u32]) -> Reply {
        let &[_, word] = payload else {
            return Reply::Error(ResponseCode::Resend);
        };
        let location = Location::from_word(word);
        if !location.is_valid(READ_PHASES) {
            return Reply::Error(ResponseCode::FileError);
        }

        let mut bytes = [0u8; BLOCK_SIZE];
        if self
            .memory
            .read(card::block_offset(location.block as usize), &mut bytes)
            .is_err()
        {
            return Reply::Error(ResponseCode::FileError);
        }

        let mut words = [0u32; 1 + BLOCK_WORDS];
        words[0] = word;
        pack_words(&bytes, &mut words[1..]);
        Reply::data(FunctionCode::Storage, &words)
    }

    fn block_write(&self, payload: &[u32], now_ms: u64) -> Reply {
        if payload.len() != 2 + PHASE_WORDS {
            return Reply::Error(ResponseCode::Resend);
        }
        let location = Location::from_word(payload[1]);
        if !location.is_valid(WRITE_PHASES) {
            return Reply::Error(ResponseCode::FileError);
        }

        let mut bytes = [0u8; PHASE_SIZE];
        unpack_words(&payload[2..], &mut bytes);
        let offset = card::block_offset(location.block as usize) + location.phase as usize * PHASE_SIZE;
        match self.memory.write(offset, &bytes, now_ms) {
            Ok(()) => Reply::Ack,
            Err(_) => Reply::Error(ResponseCode::FileError),
        }
    }
}
