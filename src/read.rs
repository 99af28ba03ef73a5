//! Read-based bzip2 decompressor over a duplicated descriptor.

use std::io::{self, Read};

use log::trace;

use crate::errors::*;
use crate::ffi::{self, BZ_MAX_UNUSED};
use crate::handle::{AsDescriptor, StreamHandle};
use crate::state::{Decompress, Stream};
use crate::{check_region, CompressionParams, TryReadExact};

const READ: &str = "Bz2Decoder::read";

/// Decodes one compressed stream read from a channel.
///
/// The decoder owns a duplicate of the channel's descriptor, so the channel
/// itself stays usable and is never closed by the decoder. Bytes read ahead
/// past the end of the stream can be recovered with [`Bz2Decoder::unused_bytes`].
pub struct Bz2Decoder {
    handle: StreamHandle<Decompress>,
    /// Read-ahead from the descriptor; `input[input_pos..input_len]` is not decoded yet.
    input: Box<[u8]>,
    input_pos: usize,
    input_len: usize,
    /// The descriptor reported end of file.
    drained: bool,
}

impl Bz2Decoder {
    /// Opens a decoder on `channel`.
    ///
    /// `small` selects low-memory decoding. `unused` seeds the decoder with
    /// bytes the caller already took off the channel that belong to the
    /// compressed stream, typically the [`Bz2Decoder::unused_bytes`] of a
    /// previous member.
    pub fn open<C>(channel: &C, small: bool, unused: Option<&[u8]>) -> Result<Self>
    where
        C: AsDescriptor + ?Sized,
    {
        let handle = StreamHandle::open(channel, || Stream::<Decompress>::new(small))?;

        let leftover = unused.unwrap_or_default();
        let mut input = vec![0_u8; BZ_MAX_UNUSED.max(leftover.len())].into_boxed_slice();
        input[..leftover.len()].copy_from_slice(leftover);

        Ok(Self {
            handle,
            input,
            input_pos: 0,
            input_len: leftover.len(),
            drained: false,
        })
    }

    pub fn with_params<C>(
        channel: &C,
        params: &CompressionParams,
        unused: Option<&[u8]>,
    ) -> Result<Self>
    where
        C: AsDescriptor + ?Sized,
    {
        Self::open(channel, params.small, unused)
    }

    /// Decodes into `buf[offset..offset + len]`, returning the number of bytes produced.
    ///
    /// When the stream ends during this call the bytes of this call are still
    /// returned; the call after that fails with [`Error::EndOfInput`].
    /// If `len` bytes are produced right up to the last decoded byte, the end
    /// may not be seen yet: the next call then returns `Ok(0)` and sets
    /// [`is_end_of_stream`](Self::is_end_of_stream), and only the call after
    /// it fails with [`Error::EndOfInput`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a region outside `buf` or a closed decoder
    /// - [`Error::EndOfInput`] once the end of the stream was reached
    /// - [`Error::DataCorruption`], [`Error::UnexpectedEndOfInput`], [`Error::Io`]
    ///   and the others close the decoder before being returned
    pub fn read_region(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<usize> {
        let range = check_region(buf.len(), offset, len, READ)?;
        self.handle.parts(READ)?;
        if self.handle.end_of_stream() {
            return Err(Error::EndOfInput);
        }

        let out = &mut buf[range];
        if out.is_empty() {
            return Ok(0);
        }

        let mut produced = 0;
        loop {
            if self.input_pos == self.input_len && !self.drained {
                self.refill()?;
            }

            let (context, _) = self.handle.parts(READ)?;
            let step = context.decompress(
                &self.input[self.input_pos..self.input_len],
                &mut out[produced..],
            );
            self.input_pos += step.consumed;
            produced += step.produced;

            match step.status {
                ffi::BZ_STREAM_END => {
                    trace!("End of stream after {} bytes", context.total_out());
                    self.handle.set_end_of_stream();
                    return Ok(produced);
                }
                ffi::BZ_OK => {}
                status => return Err(self.handle.fail(status, READ)),
            }

            if produced == out.len() {
                return Ok(produced);
            }
            if self.drained && self.input_pos == self.input_len {
                // room left, nothing more to feed: the stream was cut short
                return Err(self.handle.fail(ffi::BZ_UNEXPECTED_EOF, READ));
            }
        }
    }

    fn refill(&mut self) -> Result<()> {
        let (_, descriptor) = self.handle.parts(READ)?;
        let read = match descriptor.try_read_exact(&mut self.input) {
            Ok(n) => n,
            Err(e) => return Err(self.handle.fail_with(e.into())),
        };
        trace!("Read {} compressed bytes", read);
        self.input_pos = 0;
        self.input_len = read;
        if read == 0 {
            self.drained = true;
        }
        Ok(())
    }

    /// Returns the bytes read ahead from the descriptor that are not part of
    /// the decoded stream, e.g. the start of a following concatenated member.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] unless the end of the stream was reached.
    pub fn unused_bytes(&self) -> Result<Vec<u8>> {
        if !self.handle.is_open() {
            return Err(Error::invalid_argument(
                "Bz2Decoder::unused_bytes: stream is closed",
            ));
        }
        if !self.handle.end_of_stream() {
            return Err(Error::invalid_argument(
                "Bz2Decoder::unused_bytes: not at end of stream",
            ));
        }
        Ok(self.input[self.input_pos..self.input_len].to_vec())
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.handle.end_of_stream()
    }

    pub fn is_closed(&self) -> bool {
        !self.handle.is_open()
    }

    /// Releases the native context and the duplicated descriptor.
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        self.handle.close();
    }
}

impl Read for Bz2Decoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        match self.read_region(buf, 0, len) {
            Ok(n) => Ok(n),
            Err(Error::EndOfInput) => Ok(0),
            Err(e) => Err(e.into_io_error()),
        }
    }
}
