use std::sync::Arc;

use crate::operation::{Operation, TransportError};

/// The boundary to the actual RDMA fabric (out of scope here; see `operation::Opcode` for the
/// wire opcodes a real implementation would speak). Implementations execute one operation and
/// report whether it succeeded; this crate's completion-queue bookkeeping sits above this trait
/// and is the same regardless of whether `execute` is synchronous (as [`LoopbackStoC`] is) or
/// merely submits work that completes later on a poller thread.
///
/// [`LoopbackStoC`]: crate::LoopbackStoC
pub trait StoCTransport: Send + Sync {
    fn execute(&self, operation: Operation<'_>) -> Result<(), TransportError>;

    /// Size in bytes of `dbname`'s manifest on this StoC, or `None` if nothing has been written
    /// yet. A control-plane query rather than an RDMA operation: recovery needs to know how
    /// large a buffer to allocate before issuing an `Operation::ReadManifest`.
    fn manifest_len(&self, dbname: &str) -> Option<u64>;
}

/// Lets several `RemoteBlockClient`s share one backing StoC (recovery opening a fresh client
/// against the same manifest another client just wrote, process restart against a still-live
/// in-process loopback).
impl<T: StoCTransport + ?Sized> StoCTransport for Arc<T> {
    fn execute(&self, operation: Operation<'_>) -> Result<(), TransportError> {
        (**self).execute(operation)
    }

    fn manifest_len(&self, dbname: &str) -> Option<u64> {
        (**self).manifest_len(dbname)
    }
}
