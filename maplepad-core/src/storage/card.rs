//! VMU card layout
//!
//! A standard card is 256 blocks of 512 bytes. The top of the card holds the
//! filesystem metadata:
//!
//! | Block | Contents |
//! |---|---|
//! | 255 | system block (format signature, timestamp, layout) |
//! | 254 | FAT, one little-endian `u16` per block |
//! | 253..=241 | directory, chained downwards |
//! | 0..200 | user data |
//!
//! Filesystem fields are little-endian; this is the console's on-card format
//! and is unrelated to bus word order.

/// Bytes per block
pub const BLOCK_SIZE: usize = 512;

/// Blocks per card
pub const BLOCK_COUNT: usize = 256;

/// Card size in bytes
pub const CARD_SIZE: usize = BLOCK_SIZE * BLOCK_COUNT;

/// Phases a block write is split into
pub const WRITE_PHASES: usize = 4;

/// Phases a block read is split into
pub const READ_PHASES: usize = 1;

/// Bytes per write phase
pub const PHASE_SIZE: usize = BLOCK_SIZE / WRITE_PHASES;

/// Partitions on the card
pub const PARTITIONS: usize = 1;

pub const SYSTEM_BLOCK: usize = 255;
pub const FAT_BLOCK: usize = 254;
pub const FAT_BLOCKS: usize = 1;
pub const DIRECTORY_BLOCK: usize = 253;
pub const DIRECTORY_BLOCKS: usize = 13;
pub const USER_BLOCKS: usize = 200;

/// FAT entry of an unallocated block
pub const FAT_FREE: u16 = 0xFFFC;

/// FAT entry terminating a chain
pub const FAT_END: u16 = 0xFFFA;

/// Fill byte of the system block's format signature
pub const FORMAT_SIGNATURE: u8 = 0x55;

const SIGNATURE_LEN: usize = 16;
const TIMESTAMP_OFFSET: usize = 0x30;
const LAYOUT_OFFSET: usize = 0x46;

/// Timestamp written by format, BCD: century, year, month, day, hour, minute,
/// second, day of week
const FORMAT_TIMESTAMP: [u8; 8] = [0x20, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x05];

/// Media descriptor reported for GET_MEMORY_INFO, as 12 halfwords
pub const MEDIA_INFO: [u16; 12] = [
    (BLOCK_COUNT - 1) as u16,
    0, // partition
    SYSTEM_BLOCK as u16,
    FAT_BLOCK as u16,
    FAT_BLOCKS as u16,
    DIRECTORY_BLOCK as u16,
    DIRECTORY_BLOCKS as u16,
    0, // icon shape
    USER_BLOCKS as u16,
    31,
    0,
    0,
];

/// Byte offset of `block`
pub const fn block_offset(block: usize) -> usize {
    block * BLOCK_SIZE
}

/// Write the empty-filesystem image into `card`
///
/// `card` must be [`CARD_SIZE`] bytes.
pub fn blank_image(card: &mut [u8]) {
    card.fill(0);

    // System block
    let system = &mut card[block_offset(SYSTEM_BLOCK)..block_offset(SYSTEM_BLOCK + 1)];
    system[..SIGNATURE_LEN].fill(FORMAT_SIGNATURE);
    system[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + FORMAT_TIMESTAMP.len()]
        .copy_from_slice(&FORMAT_TIMESTAMP);
    for (i, value) in MEDIA_INFO[..9].iter().enumerate() {
        let at = LAYOUT_OFFSET + i * 2;
        system[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    // FAT: everything free except the metadata chains
    let fat = &mut card[block_offset(FAT_BLOCK)..block_offset(FAT_BLOCK + 1)];
    let mut set = |block: usize, entry: u16| {
        fat[block * 2..block * 2 + 2].copy_from_slice(&entry.to_le_bytes());
    };
    for block in 0..BLOCK_COUNT {
        set(block, FAT_FREE);
    }
    set(SYSTEM_BLOCK, FAT_END);
    set(FAT_BLOCK, FAT_END);
    let last_dir = DIRECTORY_BLOCK + 1 - DIRECTORY_BLOCKS;
    for block in last_dir + 1..=DIRECTORY_BLOCK {
        set(block, (block - 1) as u16);
    }
    set(last_dir, FAT_END);
}

/// Returns true if `system_block` carries the format signature
pub fn is_formatted(system_block: &[u8]) -> bool {
    system_block.len() >= SIGNATURE_LEN
        && system_block[..SIGNATURE_LEN]
            .iter()
            .all(|&b| b == FORMAT_SIGNATURE)
}

/// FAT entry for `block` in a card image
pub fn fat_entry(card: &[u8], block: usize) -> u16 {
    let at = block_offset(FAT_BLOCK) + block * 2;
    u16::from_le_bytes([card[at], card[at + 1]])
}
