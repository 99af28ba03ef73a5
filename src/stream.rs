//! Bzip2 compressor and decompressor
//! that do a direct stream-to-stream process, without descriptors

use std::io::{Read, Write};

use log::{debug, trace};

use crate::errors::*;
use crate::ffi;
use crate::state::{Compress, Decompress, Stream};
use crate::{check_block_size, TryReadExact};

const BUFFER_SIZE: usize = 64 * 1024;

const COMPRESS: &str = "stream::compress";
const DECOMPRESS: &str = "stream::decompress";

/// Compress `reader` to `writer` as a single bzip2 stream.
///
/// The block size is in units of 100k and must be between 1 and 9.
/// Returns the number of bytes written.
pub fn compress<R, W>(reader: &mut R, writer: &mut W, block_size: u32) -> Result<u64>
where
    R: Read,
    W: Write,
{
    check_block_size(block_size)?;
    let mut context = Stream::<Compress>::new(block_size)?;
    let mut input = vec![0_u8; BUFFER_SIZE];
    let mut output = vec![0_u8; BUFFER_SIZE];
    let mut written = 0_u64;

    loop {
        let read_len = reader.try_read_exact(&mut input)?;
        if read_len == 0 {
            break;
        }

        let mut pending = &input[..read_len];
        while !pending.is_empty() {
            let step = context.compress(pending, &mut output, ffi::BZ_RUN);
            if step.status != ffi::BZ_RUN_OK {
                return Err(fatal_status(step.status, COMPRESS));
            }
            pending = &pending[step.consumed..];
            writer.write_all(&output[..step.produced])?;
            written += step.produced as u64;
        }
    }

    loop {
        let step = context.compress(&[], &mut output, ffi::BZ_FINISH);
        if step.status != ffi::BZ_FINISH_OK && step.status != ffi::BZ_STREAM_END {
            return Err(fatal_status(step.status, COMPRESS));
        }
        writer.write_all(&output[..step.produced])?;
        written += step.produced as u64;
        if step.status == ffi::BZ_STREAM_END {
            break;
        }
    }
    writer.flush()?;

    debug!("Compressed {} bytes into {}", context.total_in(), written);
    Ok(written)
}

/// Decompress `reader` to `writer`.
///
/// Concatenated streams are decoded one after another until `reader` is
/// exhausted. Returns the number of bytes written.
///
/// # Errors
///
/// [`Error::UnexpectedEndOfInput`] if `reader` is empty or ends inside a
/// stream, [`Error::DataCorruption`] if anything but a bzip2 stream follows
/// the last complete one.
pub fn decompress<R, W>(reader: &mut R, writer: &mut W, small: bool) -> Result<u64>
where
    R: Read,
    W: Write,
{
    let mut input = vec![0_u8; BUFFER_SIZE];
    let mut output = vec![0_u8; BUFFER_SIZE];
    let (mut input_pos, mut input_len) = (0, 0);
    let mut drained = false;
    let mut context: Option<Stream<Decompress>> = None;
    let mut members = 0_usize;
    let mut written = 0_u64;

    loop {
        if input_pos == input_len && !drained {
            input_len = reader.try_read_exact(&mut input)?;
            input_pos = 0;
            drained = input_len == 0;
        }
        if drained && input_pos == input_len && context.is_none() {
            if members == 0 {
                return Err(Error::UnexpectedEndOfInput);
            }
            break;
        }

        let mut current = match context.take() {
            Some(c) => c,
            None => Stream::<Decompress>::new(small)?,
        };
        let step = current.decompress(&input[input_pos..input_len], &mut output);
        input_pos += step.consumed;
        writer.write_all(&output[..step.produced])?;
        written += step.produced as u64;

        match step.status {
            ffi::BZ_STREAM_END => {
                members += 1;
                trace!("Stream member {} ends after {} bytes", members, current.total_out());
            }
            ffi::BZ_OK => {
                if drained && input_pos == input_len && step.produced < output.len() {
                    return Err(Error::UnexpectedEndOfInput);
                }
                context = Some(current);
            }
            status => return Err(fatal_status(status, DECOMPRESS)),
        }
    }
    writer.flush()?;

    debug!("Decompressed {} stream member(s) into {} bytes", members, written);
    Ok(written)
}
