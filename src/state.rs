//! Owned libbz2 stream contexts.

use std::marker::PhantomData;
use std::mem;
use std::os::raw::{c_char, c_int, c_uint};

use crate::errors::*;
use crate::ffi::{self, bz_stream};

/// Direction of a native stream; decides how the context is torn down.
pub trait Direction {
    const NAME: &'static str;

    /// # Safety
    ///
    /// `raw` must point to a stream successfully initialized in this direction.
    unsafe fn destroy(raw: *mut bz_stream) -> c_int;
}

pub enum Compress {}
pub enum Decompress {}

impl Direction for Compress {
    const NAME: &'static str = "encoder";

    unsafe fn destroy(raw: *mut bz_stream) -> c_int {
        ffi::BZ2_bzCompressEnd(raw)
    }
}

impl Direction for Decompress {
    const NAME: &'static str = "decoder";

    unsafe fn destroy(raw: *mut bz_stream) -> c_int {
        ffi::BZ2_bzDecompressEnd(raw)
    }
}

/// Outcome of one native step: the raw status and how far both buffers moved.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub status: c_int,
    pub consumed: usize,
    pub produced: usize,
}

/// An initialized `bz_stream`, ended exactly once on drop.
///
/// The struct is boxed because libbz2 keeps a back-pointer to it.
pub struct Stream<D: Direction> {
    raw: Box<bz_stream>,
    _direction: PhantomData<D>,
}

// Each context is exclusively owned and libbz2 keeps no global state, so a
// context may move between threads. It is not `Sync`.
unsafe impl<D: Direction> Send for Stream<D> {}

impl<D: Direction> Stream<D> {
    fn zeroed() -> Box<bz_stream> {
        // all-null pointers and counters select the default allocator
        unsafe { Box::new(mem::zeroed()) }
    }

    /// Total bytes produced so far.
    pub fn total_out(&self) -> u64 {
        (u64::from(self.raw.total_out_hi32) << 32) | u64::from(self.raw.total_out_lo32)
    }

    /// Total bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        (u64::from(self.raw.total_in_hi32) << 32) | u64::from(self.raw.total_in_lo32)
    }

    fn step<F>(&mut self, input: &[u8], output: &mut [u8], call: F) -> Step
    where
        F: FnOnce(*mut bz_stream) -> c_int,
    {
        let avail_in = clamp_len(input.len());
        let avail_out = clamp_len(output.len());

        let raw = &mut *self.raw;
        // libbz2 never writes through `next_in`
        raw.next_in = input.as_ptr() as *mut c_char;
        raw.avail_in = avail_in;
        raw.next_out = output.as_mut_ptr() as *mut c_char;
        raw.avail_out = avail_out;

        let status = call(&mut *raw as *mut bz_stream);

        let step = Step {
            status,
            consumed: (avail_in - raw.avail_in) as usize,
            produced: (avail_out - raw.avail_out) as usize,
        };
        raw.next_in = std::ptr::null_mut();
        raw.avail_in = 0;
        raw.next_out = std::ptr::null_mut();
        raw.avail_out = 0;
        step
    }
}

impl Stream<Decompress> {
    /// `small` selects the slower, low-memory decoding variant.
    pub fn new(small: bool) -> Result<Self> {
        let mut raw = Self::zeroed();
        let status = unsafe { ffi::BZ2_bzDecompressInit(&mut *raw, 0, c_int::from(small)) };
        map_status(status, "Bz2Decoder::open")?;
        Ok(Self {
            raw,
            _direction: PhantomData,
        })
    }

    /// Decodes from `input` into `output`, returning the raw status.
    pub fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Step {
        self.step(input, output, |raw| unsafe { ffi::BZ2_bzDecompress(raw) })
    }
}

impl Stream<Compress> {
    /// `block_size` is in units of 100k and must already be validated.
    pub fn new(block_size: u32) -> Result<Self> {
        let mut raw = Self::zeroed();
        let status = unsafe { ffi::BZ2_bzCompressInit(&mut *raw, block_size as c_int, 0, 0) };
        map_status(status, "Bz2Encoder::open")?;
        Ok(Self {
            raw,
            _direction: PhantomData,
        })
    }

    /// Encodes from `input` into `output` with `action` (`BZ_RUN` or `BZ_FINISH`).
    pub fn compress(&mut self, input: &[u8], output: &mut [u8], action: c_int) -> Step {
        self.step(input, output, |raw| unsafe { ffi::BZ2_bzCompress(raw, action) })
    }
}

impl<D: Direction> Drop for Stream<D> {
    fn drop(&mut self) {
        unsafe {
            D::destroy(&mut *self.raw);
        }
    }
}

fn clamp_len(len: usize) -> c_uint {
    c_uint::try_from(len).unwrap_or(c_uint::MAX)
}
