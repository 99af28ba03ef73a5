//! Lifecycle of a stream handle: one native context plus one duplicated
//! descriptor, acquired together and released together.

use std::fs::File;
use std::io;
use std::os::raw::c_int;

use log::debug;

use crate::errors::*;
use crate::state::{Direction, Stream};

/// A channel whose low-level descriptor can be duplicated.
#[cfg(unix)]
pub use std::os::fd::AsFd as AsDescriptor;
/// A channel whose low-level descriptor can be duplicated.
#[cfg(windows)]
pub use std::os::windows::io::AsHandle as AsDescriptor;

/// Duplicates the descriptor behind `channel`.
///
/// The duplicate has its own lifetime: closing either one leaves the other valid.
fn duplicate<C>(channel: &C) -> io::Result<File>
where
    C: AsDescriptor + ?Sized,
{
    #[cfg(unix)]
    let owned = channel.as_fd().try_clone_to_owned()?;
    #[cfg(windows)]
    let owned = channel.as_handle().try_clone_to_owned()?;
    Ok(File::from(owned))
}

enum State<D: Direction> {
    Open { context: Stream<D>, descriptor: File },
    Closed,
}

pub(crate) struct StreamHandle<D: Direction> {
    state: State<D>,
    end_of_stream: bool,
}

impl<D: Direction> StreamHandle<D> {
    /// Duplicates the descriptor of `channel`, then creates the native context with `init`.
    ///
    /// On failure nothing stays acquired.
    pub fn open<C, F>(channel: &C, init: F) -> Result<Self>
    where
        C: AsDescriptor + ?Sized,
        F: FnOnce() -> Result<Stream<D>>,
    {
        let descriptor = duplicate(channel)?;
        let context = init()?;
        debug!("Opened {} handle", D::NAME);
        Ok(Self {
            state: State::Open {
                context,
                descriptor,
            },
            end_of_stream: false,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    pub fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Flips the flag; it never goes back.
    pub fn set_end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    /// Borrows the context and the descriptor of an open handle.
    pub fn parts(&mut self, operation: &str) -> Result<(&mut Stream<D>, &mut File)> {
        match &mut self.state {
            State::Open {
                context,
                descriptor,
            } => Ok((context, descriptor)),
            State::Closed => Err(Error::InvalidArgument(format!(
                "{}: stream is closed",
                operation
            ))),
        }
    }

    /// Releases the context, then the descriptor. A closed handle is left alone.
    pub fn close(&mut self) {
        if let State::Open {
            context,
            descriptor,
        } = std::mem::replace(&mut self.state, State::Closed)
        {
            debug!(
                "Closing {} handle ({} bytes in, {} bytes out)",
                D::NAME,
                context.total_in(),
                context.total_out()
            );
            drop(context);
            drop(descriptor);
        }
    }

    /// Maps a fatal native status, closing the handle before handing the error back.
    pub fn fail(&mut self, status: c_int, operation: &str) -> Error {
        // mapped first so an I/O failure still sees the OS error of the failing call
        let error = fatal_status(status, operation);
        self.fail_with(error)
    }

    /// Closes the handle and hands `error` back.
    pub fn fail_with(&mut self, error: Error) -> Error {
        debug!("Fatal {} error: {}", D::NAME, error);
        self.close();
        error
    }
}
