//! Component C4: the memtable pool. A [`Memtable`] is an arena-backed skiplist of internal keys;
//! an [`AtomicMemTable`] is the single-slot state machine (publish / ref / seal / flush) that lets
//! readers and the flusher share one memtable safely without a single global lock.

mod atomic_memtable;
mod id_pool;
mod memtable;

pub use atomic_memtable::{AtomicMemTable, RefOutcome};
pub use id_pool::{MemtableId, MemtableIdPool, PoolExhausted, MAX_LIVE_MEMTABLES};
pub use memtable::Memtable;
