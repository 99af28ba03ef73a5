//! One-shot compression and decompression of in-memory buffers.
//!
//! The output size is not known up front, so the destination starts at a
//! size estimate and doubles every time libbz2 reports it full.

use std::os::raw::{c_char, c_int, c_uint};

use bytesize::ByteSize;
use log::trace;

use crate::errors::*;
use crate::ffi;
use crate::{check_block_size, check_region, CompressionParams};

const COMPRESS: &str = "buffer::compress";
const DECOMPRESS: &str = "buffer::decompress";

/// Compresses all of `data`. See [`compress_region`].
pub fn compress(data: &[u8], block_size: u32) -> Result<Vec<u8>> {
    compress_region(data, 0, data.len(), block_size)
}

/// Compresses `data[offset..offset + len]` with a block size in units of 100k.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for a block size outside 1..=9 or a region
///   outside `data`; libbz2 is not called in that case
/// - [`Error::OutOfMemory`] for any failure of the engine or of growing the
///   destination
pub fn compress_region(
    data: &[u8],
    offset: usize,
    len: usize,
    block_size: u32,
) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let range = check_region(data.len(), offset, len, COMPRESS)?;
    let source = &data[range];
    let source_len = source_len(source, COMPRESS)?;

    let mut dest = Vec::new();
    let mut capacity = compress_bound(source.len())?;
    loop {
        let mut dest_len = reserve(&mut dest, capacity)?;
        let status = unsafe {
            ffi::BZ2_bzBuffToBuffCompress(
                dest.as_mut_ptr() as *mut c_char,
                &mut dest_len,
                source.as_ptr() as *mut c_char,
                source_len,
                block_size as c_int,
                0,
                0,
            )
        };
        match status {
            ffi::BZ_OK => return Ok(finish(dest, dest_len)),
            ffi::BZ_OUTBUFF_FULL => capacity = grow(capacity)?,
            _ => return Err(Error::OutOfMemory),
        }
    }
}

pub fn compress_with(data: &[u8], params: &CompressionParams) -> Result<Vec<u8>> {
    compress(data, params.block_size)
}

/// Decompresses all of `data`. See [`decompress_region`].
pub fn decompress(data: &[u8], small: bool) -> Result<Vec<u8>> {
    decompress_region(data, 0, data.len(), small)
}

/// Decompresses `data[offset..offset + len]`, which must hold exactly one
/// compressed stream. `small` selects low-memory decoding.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for a region outside `data`
/// - [`Error::OutOfMemory`] if the engine or the destination runs out of memory
/// - [`Error::DataCorruption`] for malformed or non-bzip2 data
/// - [`Error::UnexpectedEndOfInput`] for a truncated stream
pub fn decompress_region(
    data: &[u8],
    offset: usize,
    len: usize,
    small: bool,
) -> Result<Vec<u8>> {
    let range = check_region(data.len(), offset, len, DECOMPRESS)?;
    let source = &data[range];
    let source_len = source_len(source, DECOMPRESS)?;

    let mut dest = Vec::new();
    // a guess, not a bound
    let mut capacity = source.len().saturating_mul(2);
    loop {
        let mut dest_len = reserve(&mut dest, capacity)?;
        let status = unsafe {
            ffi::BZ2_bzBuffToBuffDecompress(
                dest.as_mut_ptr() as *mut c_char,
                &mut dest_len,
                source.as_ptr() as *mut c_char,
                source_len,
                c_int::from(small),
                0,
            )
        };
        match status {
            ffi::BZ_OK => return Ok(finish(dest, dest_len)),
            ffi::BZ_OUTBUFF_FULL => capacity = grow(capacity)?,
            ffi::BZ_MEM_ERROR => return Err(Error::OutOfMemory),
            status => return Err(fatal_status(status, DECOMPRESS)),
        }
    }
}

pub fn decompress_with(data: &[u8], params: &CompressionParams) -> Result<Vec<u8>> {
    decompress(data, params.small)
}

fn source_len(source: &[u8], context: &str) -> Result<c_uint> {
    c_uint::try_from(source.len())
        .map_err(|_| Error::InvalidArgument(format!("{}: input larger than 4 GiB", context)))
}

/// Worst-case size of compressing `len` bytes: `ceil(len * 1.01) + 600`.
fn compress_bound(len: usize) -> Result<usize> {
    let overhead = len / 100 + usize::from(len % 100 != 0) + 600;
    len.checked_add(overhead).ok_or(Error::OutOfMemory)
}

/// Doubles a destination size, capped at what libbz2 can address.
fn grow(capacity: usize) -> Result<usize> {
    let limit = c_uint::MAX as usize;
    if capacity >= limit {
        return Err(Error::OutOfMemory);
    }
    // an empty destination still has to grow
    let next = capacity.max(1).saturating_mul(2).min(limit);
    trace!("Output buffer full, growing to {}", ByteSize(next as u64));
    Ok(next)
}

/// Resizes `dest` to `capacity` bytes, returning the length to hand to libbz2.
fn reserve(dest: &mut Vec<u8>, capacity: usize) -> Result<c_uint> {
    let additional = capacity.saturating_sub(dest.len());
    dest.try_reserve_exact(additional).map_err(|_| Error::OutOfMemory)?;
    dest.resize(capacity, 0);
    Ok(c_uint::try_from(capacity).unwrap_or(c_uint::MAX))
}

fn finish(mut dest: Vec<u8>, dest_len: c_uint) -> Vec<u8> {
    dest.truncate(dest_len as usize);
    dest.shrink_to_fit();
    dest
}
