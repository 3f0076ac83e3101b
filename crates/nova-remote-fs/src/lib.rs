//! Component C3: `RemoteFile`, the LTC-side handle to data that actually lives on a StoC.
//!
//! [`RemoteWritableFile`] fills an in-memory slab buffer (mirrored to a local on-disk file) and
//! ships it to the StoC once, on `sync`. [`RemoteRandomAccessFile`] reads a remote file back,
//! either one block at a time or by prefetching the whole thing, depending on how it was opened.

mod error;
mod local_mirror;
mod random_access;
mod writable;

pub use error::{Error, Result};
pub use local_mirror::{LocalMirrorReader, LocalMirrorWriter};
pub use random_access::{RemoteRandomAccessFile, MAX_BLOCK_SIZE};
pub use writable::{FileKind, RemoteWritableFile};
