//! Bzip2 compression over byte descriptors and in-memory buffers.
//!
//! [`read::Bz2Decoder`] and [`write::Bz2Encoder`] own a libbz2 context and a
//! duplicated descriptor of the channel they were opened on. [`buffer`] holds
//! the one-shot whole-buffer transforms.

use std::ffi::CStr;
use std::io::{self, ErrorKind, Read};
use std::ops::Range;

pub mod buffer;
pub mod errors;
pub mod ffi;
mod handle;
pub mod header;
pub mod read;
mod state;
pub mod stream;
pub mod write;

pub use errors::{Error, Result};
pub use handle::AsDescriptor;

/// The signature of a bzip2 stream, followed by the block size digit.
pub const MAGIC_NUMBER: &[u8; 3] = b"BZh";

pub const MIN_BLOCK_SIZE: u32 = 1;
pub const MAX_BLOCK_SIZE: u32 = 9;
pub const DEFAULT_BLOCK_SIZE: u32 = 9;

/// Parameters of the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    /// Block size in units of 100k, between 1 and 9. Compression only.
    pub block_size: u32,
    /// Low-memory decoding. Decompression only.
    pub small: bool,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            small: false,
        }
    }
}

impl CompressionParams {
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_small(mut self, small: bool) -> Self {
        self.small = small;
        self
    }

    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the block size is out of range.
    pub fn validate(&self) -> Result<()> {
        check_block_size(self.block_size)
    }

    /// The block size in bytes.
    pub fn block_size_bytes(&self) -> u64 {
        u64::from(self.block_size) * 100_000
    }
}

/// Returns the version string of the linked libbz2.
pub fn version() -> String {
    unsafe { CStr::from_ptr(ffi::BZ2_bzlibVersion()) }
        .to_string_lossy()
        .into_owned()
}

pub fn check_block_size(block_size: u32) -> Result<()> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(Error::InvalidArgument(format!(
            "block size must be between {} and {}, got {}",
            MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, block_size
        )));
    }
    Ok(())
}

/// Validates `offset..offset + len` against a buffer of `capacity` bytes.
pub(crate) fn check_region(
    capacity: usize,
    offset: usize,
    len: usize,
    context: &str,
) -> Result<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(offset..end),
        _ => Err(Error::invalid_argument(context)),
    }
}

pub(crate) trait TryReadExact {
    /// Reads until `buf` is full or the reader hits EOF.
    /// Returns the number of bytes read; zero means EOF.
    fn try_read_exact(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read + ?Sized> TryReadExact for R {
    fn try_read_exact(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
