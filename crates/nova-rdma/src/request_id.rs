use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one outstanding asynchronous request. Completion is detected per-id, never by
/// submission order: the fabric may finish requests out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct RequestIdAllocator(AtomicU64);

impl RequestIdAllocator {
    pub(crate) fn next(&self) -> RequestId {
        RequestId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}
