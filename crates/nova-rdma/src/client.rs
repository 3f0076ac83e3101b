use crate::completion::CompletionQueue;
use crate::operation::{Operation, TransportError};
use crate::request_id::{RequestId, RequestIdAllocator};
use crate::transport::StoCTransport;

/// Asynchronous RPC facade over a [`StoCTransport`] (component C2).
///
/// Every `initiate_*` method returns a [`RequestId`] immediately; completion is detected with
/// [`Self::is_done`] or [`Self::wait`]. Completions may be observed out of submission order:
/// callers must not assume FIFO delivery, and correctness must rest on checking each request's
/// own id.
#[derive(Debug)]
pub struct RemoteBlockClient<T> {
    transport:   T,
    ids:         RequestIdAllocator,
    completions: CompletionQueue,
}

impl<T: StoCTransport> RemoteBlockClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport, ids: RequestIdAllocator::default(), completions: CompletionQueue::default() }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn initiate_read_block(
        &self,
        dbname:      &str,
        file_number: u64,
        offset:      u64,
        dst_buf:     &mut [u8],
    ) -> RequestId {
        self.submit(Operation::ReadBlock { dbname, file_number, offset, dst: dst_buf })
    }

    /// Whole-file prefetch.
    pub fn initiate_read_sstable(&self, dbname: &str, file_number: u64, dst_buf: &mut [u8]) -> RequestId {
        self.submit(Operation::ReadSstable { dbname, file_number, dst: dst_buf })
    }

    /// Ships a built SSTable to its home StoC.
    pub fn initiate_flush_sstable(&self, dbname: &str, file_number: u64, src_buf: &[u8]) -> RequestId {
        self.submit(Operation::FlushSstable { dbname, file_number, src: src_buf })
    }

    /// Ships a manifest append to its home StoC; separate from `initiate_flush_sstable` because
    /// the destination file is the DB's manifest, not an SSTable.
    pub fn initiate_write_manifest(&self, dbname: &str, src_buf: &[u8]) -> RequestId {
        self.submit(Operation::WriteManifest { dbname, src: src_buf })
    }

    /// Whole-manifest fetch, used on recovery. Callers should size `dst_buf` from
    /// [`Self::manifest_len`] first.
    pub fn initiate_read_manifest(&self, dbname: &str, dst_buf: &mut [u8]) -> RequestId {
        self.submit(Operation::ReadManifest { dbname, dst: dst_buf })
    }

    /// Size in bytes of `dbname`'s manifest on the StoC, or `None` if nothing has been written
    /// yet (a brand-new database).
    #[must_use]
    pub fn manifest_len(&self, dbname: &str) -> Option<u64> {
        self.transport.manifest_len(dbname)
    }

    /// Used by migration: ships an opaque buffer to a destination LTC.
    pub fn initiate_rdma_write(&self, remote_ltc_id: u32, src_buf: &[u8]) -> RequestId {
        self.submit(Operation::RdmaWrite { remote_ltc_id, src: src_buf })
    }

    /// Unlinks a file a version edit obsoleted. Callers should treat failure as a warning, not a
    /// fatal error: the file is already unreferenced by every live version.
    pub fn initiate_delete_file(&self, dbname: &str, file_number: u64) -> RequestId {
        self.submit(Operation::DeleteFile { dbname, file_number })
    }

    /// Polls completion of `request_id`. Transitions false -> true exactly once; callers that
    /// need the result (success or [`TransportError`]) should use [`Self::take_result`].
    #[must_use]
    pub fn is_done(&self, request_id: RequestId) -> bool {
        self.completions.is_done(request_id)
    }

    /// Blocks until at least one outstanding request completes, returning its id.
    pub fn wait(&self) -> RequestId {
        self.completions.wait_any()
    }

    /// Blocks until `request_id` specifically completes, busy-polling `is_done` as the source
    /// engine does (suspension-point (d)).
    pub fn wait_for(&self, request_id: RequestId) -> Result<(), TransportError> {
        while !self.is_done(request_id) {
            std::hint::spin_loop();
        }
        self.take_result(request_id).expect("request_id was just observed done")
    }

    /// Removes and returns the result of a completed request. Returns `None` if still pending.
    pub fn take_result(&self, request_id: RequestId) -> Option<Result<(), TransportError>> {
        self.completions.take_result(request_id)
    }

    fn submit(&self, operation: Operation<'_>) -> RequestId {
        let id = self.ids.next();
        self.completions.register_pending(id);
        let opcode = operation.opcode();
        let result = self.transport.execute(operation);
        if let Err(ref err) = result {
            tracing::warn!(?opcode, request_id = id.as_u64(), %err, "RDMA request failed");
        }
        self.completions.complete(id, result);
        id
    }
}
