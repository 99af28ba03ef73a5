use std::io;
use std::os::raw::c_int;

use thiserror::Error;

use crate::ffi;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A bad parameter or an out-of-bounds buffer region.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Out of memory")]
    OutOfMemory,
    /// The compressed data is malformed or is not bzip2 data at all.
    #[error("Compressed data is corrupt")]
    DataCorruption,
    /// The compressed stream was cut short.
    #[error("Unexpected end of compressed input")]
    UnexpectedEndOfInput,
    /// A read was attempted after the stream already ended.
    #[error("End of input")]
    EndOfInput,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Converts into an [`io::Error`] for the [`io::Read`] and [`io::Write`] impls.
    pub fn into_io_error(self) -> io::Error {
        let kind = match self {
            Error::Io(e) => return e,
            Error::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            Error::DataCorruption => io::ErrorKind::InvalidData,
            Error::UnexpectedEndOfInput | Error::EndOfInput => io::ErrorKind::UnexpectedEof,
            Error::Other(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        e.into_io_error()
    }
}

/// Maps a libbz2 status code.
///
/// Non-negative codes (including stream end) are passed through untouched;
/// negative codes become the matching [`Error`]. `context` names the failing
/// operation and ends up in [`Error::InvalidArgument`] and [`Error::Other`].
///
/// Callers owning a stream handle must release it before surfacing the error.
pub fn map_status(code: c_int, context: &str) -> Result<c_int> {
    if code >= 0 {
        return Ok(code);
    }
    Err(match code {
        ffi::BZ_PARAM_ERROR => Error::invalid_argument(context),
        ffi::BZ_MEM_ERROR => Error::OutOfMemory,
        ffi::BZ_DATA_ERROR | ffi::BZ_DATA_ERROR_MAGIC => Error::DataCorruption,
        ffi::BZ_UNEXPECTED_EOF => Error::UnexpectedEndOfInput,
        // the OS error text at the moment of failure
        ffi::BZ_IO_ERROR => Error::Io(io::Error::last_os_error()),
        _ => Error::Other(context.into()),
    })
}

/// Like [`map_status`] for a status that is fatal where it occurs, even a non-negative one.
pub(crate) fn fatal_status(code: c_int, context: &str) -> Error {
    match map_status(code, context) {
        Err(e) => e,
        Ok(code) => Error::Other(format!("{}: unexpected status {}", context, code)),
    }
}
