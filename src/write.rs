//! Write-based bzip2 compressor over a duplicated descriptor.

use std::io::{self, Write};

use log::{trace, warn};

use crate::errors::*;
use crate::ffi::{self, BZ_MAX_UNUSED};
use crate::handle::{AsDescriptor, StreamHandle};
use crate::state::{Compress, Stream};
use crate::{check_block_size, check_region, CompressionParams};

const WRITE: &str = "Bz2Encoder::write";
const CLOSE: &str = "Bz2Encoder::close";

/// Encodes one compressed stream onto a channel.
///
/// The stream is only complete after [`Bz2Encoder::close`]; dropping an open
/// encoder finalizes it on a best-effort basis.
pub struct Bz2Encoder {
    handle: StreamHandle<Compress>,
    buffer: Box<[u8]>,
}

impl Bz2Encoder {
    /// The block size is in units of 100k and must be between 1 and 9.
    ///
    /// # Errors
    ///
    /// This returns [`Error::InvalidArgument`] if the block size is invalid;
    /// the channel is not touched in that case.
    pub fn open<C>(channel: &C, block_size: u32) -> Result<Self>
    where
        C: AsDescriptor + ?Sized,
    {
        check_block_size(block_size)?;
        let handle = StreamHandle::open(channel, || Stream::<Compress>::new(block_size))?;
        Ok(Self {
            handle,
            buffer: vec![0_u8; BZ_MAX_UNUSED].into_boxed_slice(),
        })
    }

    pub fn with_params<C>(channel: &C, params: &CompressionParams) -> Result<Self>
    where
        C: AsDescriptor + ?Sized,
    {
        Self::open(channel, params.block_size)
    }

    /// Feeds `buf[offset..offset + len]` to the encoder.
    ///
    /// Any failure closes the encoder before it is returned.
    pub fn write_region(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<()> {
        let range = check_region(buf.len(), offset, len, WRITE)?;
        self.handle.parts(WRITE)?;

        let mut input = &buf[range];
        while !input.is_empty() {
            let (context, _) = self.handle.parts(WRITE)?;
            let step = context.compress(input, &mut self.buffer, ffi::BZ_RUN);
            if step.status != ffi::BZ_RUN_OK {
                return Err(self.handle.fail(step.status, WRITE));
            }
            input = &input[step.consumed..];
            self.drain(step.produced, WRITE)?;
        }
        Ok(())
    }

    /// Writes the first `produced` bytes of the scratch buffer to the descriptor.
    fn drain(&mut self, produced: usize, operation: &str) -> Result<()> {
        if produced == 0 {
            return Ok(());
        }
        let (_, descriptor) = self.handle.parts(operation)?;
        if let Err(e) = descriptor.write_all(&self.buffer[..produced]) {
            return Err(self.handle.fail_with(e.into()));
        }
        trace!("Wrote {} compressed bytes", produced);
        Ok(())
    }

    /// Writes the stream trailer, then releases the native context and the
    /// duplicated descriptor. Closing a closed encoder is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.handle.is_open() {
            return Ok(());
        }

        loop {
            let (context, _) = self.handle.parts(CLOSE)?;
            let step = context.compress(&[], &mut self.buffer, ffi::BZ_FINISH);
            if step.status != ffi::BZ_FINISH_OK && step.status != ffi::BZ_STREAM_END {
                return Err(self.handle.fail(step.status, CLOSE));
            }
            self.drain(step.produced, CLOSE)?;
            if step.status == ffi::BZ_STREAM_END {
                break;
            }
        }

        let (_, descriptor) = self.handle.parts(CLOSE)?;
        if let Err(e) = descriptor.flush() {
            return Err(self.handle.fail_with(e.into()));
        }
        self.handle.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        !self.handle.is_open()
    }
}

impl Write for Bz2Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_region(buf, 0, buf.len())
            .map_err(Error::into_io_error)?;
        Ok(buf.len())
    }

    /// Flushes the descriptor. The compressed stream itself is only
    /// complete after [`Bz2Encoder::close`].
    fn flush(&mut self) -> io::Result<()> {
        let (_, descriptor) = self.handle.parts(WRITE).map_err(Error::into_io_error)?;
        descriptor.flush()
    }
}

impl Drop for Bz2Encoder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to finalize bzip2 stream on drop: {}", e);
        }
    }
}
