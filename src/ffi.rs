//! Native libbz2 surface used by this crate.
//!
//! The streaming entry points and the status vocabulary come from `bzip2-sys`.
//! The one-shot buffer routines and the version query live in the same
//! library but are not exported by `bzip2-sys`, so they are declared here.

use std::os::raw::{c_char, c_int, c_uint};

pub use bzip2_sys::{
    bz_stream, BZ2_bzCompress, BZ2_bzCompressEnd, BZ2_bzCompressInit, BZ2_bzDecompress,
    BZ2_bzDecompressEnd, BZ2_bzDecompressInit, BZ_CONFIG_ERROR, BZ_DATA_ERROR,
    BZ_DATA_ERROR_MAGIC, BZ_FINISH, BZ_FINISH_OK, BZ_IO_ERROR, BZ_MEM_ERROR, BZ_OK,
    BZ_OUTBUFF_FULL, BZ_PARAM_ERROR, BZ_RUN, BZ_RUN_OK, BZ_SEQUENCE_ERROR, BZ_STREAM_END,
    BZ_UNEXPECTED_EOF,
};

/// Size of the read-ahead and write-out scratch buffers of a stream handle.
pub const BZ_MAX_UNUSED: usize = 5000;

// `system` is the C ABI everywhere except 32-bit Windows, where libbz2 uses WINAPI.
extern "system" {
    pub fn BZ2_bzBuffToBuffCompress(
        dest: *mut c_char,
        dest_len: *mut c_uint,
        source: *mut c_char,
        source_len: c_uint,
        block_size_100k: c_int,
        verbosity: c_int,
        work_factor: c_int,
    ) -> c_int;

    pub fn BZ2_bzBuffToBuffDecompress(
        dest: *mut c_char,
        dest_len: *mut c_uint,
        source: *mut c_char,
        source_len: c_uint,
        small: c_int,
        verbosity: c_int,
    ) -> c_int;

    pub fn BZ2_bzlibVersion() -> *const c_char;
}
