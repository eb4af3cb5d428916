//! Packet encoding and decoding for the Maple bus.
//!
//! Packet layout (in words, after the transport has assembled the bits):
//! - word 0: `LENGTH << 24 | SENDER << 16 | RECIPIENT << 8 | COMMAND`
//! - words 1..=LENGTH: payload
//! - trailing byte: XOR of all bytes of all preceding words

use heapless::Vec;

/// Maximum payload length in words (LENGTH is a single byte)
pub const MAX_PAYLOAD_WORDS: usize = 255;

/// Maximum packet size in words, header included
pub const MAX_FRAME_WORDS: usize = 1 + MAX_PAYLOAD_WORDS;

/// Errors that can occur during packet decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No header word was received
    Empty,
    /// Header LENGTH does not match the number of words received
    LengthMismatch,
    /// Checksum mismatch
    InvalidChecksum,
    /// Payload exceeds 255 words
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or response code
    pub command: u8,
    /// Address of the recipient (port bits included)
    pub recipient: u8,
    /// Address of the sender (port bits included)
    pub sender: u8,
    /// Payload words
    pub payload: Vec<u32, MAX_PAYLOAD_WORDS>,
}

impl Frame {
    /// Create a new packet with the given payload
    pub fn new(command: u8, recipient: u8, sender: u8, payload: &[u32]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            command,
            recipient,
            sender,
            payload,
        })
    }

    /// Create a packet with no payload
    pub fn empty(command: u8, recipient: u8, sender: u8) -> Self {
        Self {
            command,
            recipient,
            sender,
            payload: Vec::new(),
        }
    }

    /// Build the header word for this packet
    pub fn header(&self) -> u32 {
        (self.payload.len() as u32) << 24
            | (self.sender as u32) << 16
            | (self.recipient as u32) << 8
            | self.command as u32
    }

    /// Payload word at `index`, if present
    pub fn word(&self, index: usize) -> Option<u32> {
        self.payload.get(index).copied()
    }

    /// XOR of every byte of `words`
    pub fn checksum(words: &[u32]) -> u8 {
        let folded = words.iter().fold(0u32, |acc, w| acc ^ w);
        folded.to_be_bytes().iter().fold(0u8, |acc, b| acc ^ b)
    }

    /// Encode this packet into a word buffer
    ///
    /// Returns the number of words written and the trailing check byte.
    pub fn encode(&self, buffer: &mut [u32]) -> Result<(usize, u8), FrameError> {
        let len = 1 + self.payload.len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = self.header();
        buffer[1..len].copy_from_slice(&self.payload);

        Ok((len, Self::checksum(&buffer[..len])))
    }

    /// Decode a packet from received words and the received check byte
    pub fn decode(words: &[u32], crc: u8) -> Result<Self, FrameError> {
        let (&header, payload) = words.split_first().ok_or(FrameError::Empty)?;

        let length = (header >> 24) as usize;
        if length != payload.len() {
            return Err(FrameError::LengthMismatch);
        }
        if Self::checksum(words) != crc {
            return Err(FrameError::InvalidChecksum);
        }

        Self::new(header as u8, (header >> 8) as u8, (header >> 16) as u8, payload)
    }
}

/// Pack bytes into words, most significant byte first
///
/// A trailing partial word is zero-filled. Returns the number of words written.
pub fn pack_words(bytes: &[u8], words: &mut [u32]) -> usize {
    let mut count = 0;
    for (chunk, word) in bytes.chunks(4).zip(words.iter_mut()) {
        let mut be = [0u8; 4];
        be[..chunk.len()].copy_from_slice(chunk);
        *word = u32::from_be_bytes(be);
        count += 1;
    }
    count
}

/// Unpack words into bytes, most significant byte first
///
/// Returns the number of bytes written.
pub fn unpack_words(words: &[u32], bytes: &mut [u8]) -> usize {
    let mut count = 0;
    for (word, chunk) in words.iter().zip(bytes.chunks_mut(4)) {
        let be = word.to_be_bytes();
        chunk.copy_from_slice(&be[..chunk.len()]);
        count += chunk.len();
    }
    count
}
