//! Recognising bzip2 data by its stream header.
//!
//! A stream starts with `BZh`, the block size digit, and then either the
//! magic of the first block or, for an empty stream, the end-of-stream magic.

use byteorder::{BigEndian, ByteOrder};

use crate::{MAGIC_NUMBER, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};

/// 48-bit magic opening every compressed block (BCD pi).
pub const BLOCK_MAGIC: u64 = 0x3141_5926_5359;
/// 48-bit magic opening the stream trailer (BCD sqrt(pi)).
pub const END_OF_STREAM_MAGIC: u64 = 0x1772_4538_5090;

/// Bytes needed by [`StreamHeader::parse`].
pub const HEADER_LEN: usize = MAGIC_NUMBER.len() + 1 + 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Block size in units of 100k.
    pub block_size: u32,
    /// The stream holds no blocks at all.
    pub is_empty_stream: bool,
}

impl StreamHeader {
    /// Parses the first [`HEADER_LEN`] bytes of `data`, or returns `None` if
    /// they do not start a bzip2 stream.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN || &data[..MAGIC_NUMBER.len()] != MAGIC_NUMBER {
            return None;
        }

        let digit = data[MAGIC_NUMBER.len()];
        let block_size = u32::from(digit.checked_sub(b'0')?);
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return None;
        }

        let is_empty_stream = match BigEndian::read_u48(&data[MAGIC_NUMBER.len() + 1..]) {
            BLOCK_MAGIC => false,
            END_OF_STREAM_MAGIC => true,
            _ => return None,
        };
        Some(Self {
            block_size,
            is_empty_stream,
        })
    }
}

/// Whether `data` starts with a bzip2 stream header.
pub fn is_bzip2(data: &[u8]) -> bool {
    StreamHeader::parse(data).is_some()
}
