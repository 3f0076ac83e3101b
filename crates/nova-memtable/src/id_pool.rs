use parking_lot::Mutex;
use thiserror::Error;

/// Upper bound on concurrently live memtables across a DB.
pub const MAX_LIVE_MEMTABLES: u32 = 100_000;

/// A 32-bit handle drawn from a [`MemtableIdPool`], used to address an
/// [`AtomicMemTable`](crate::AtomicMemTable) slot.
///
/// [`AtomicMemTable`]: crate::AtomicMemTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemtableId(u32);

impl MemtableId {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// A process-wide pool of memtable ids, bounded to [`MAX_LIVE_MEMTABLES`]. Released ids are
/// reused rather than growing the counter forever.
#[derive(Debug)]
pub struct MemtableIdPool {
    capacity: u32,
    // Free ids, kept as a stack so recently-released ids (more likely to still be warm in
    // whatever per-id side tables the caller keeps) are handed out first.
    free:     Mutex<Vec<u32>>,
    next_new: Mutex<u32>,
}

impl MemtableIdPool {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self { capacity, free: Mutex::new(Vec::new()), next_new: Mutex::new(0) }
    }

    #[must_use]
    pub fn bounded() -> Self {
        Self::new(MAX_LIVE_MEMTABLES)
    }

    pub fn acquire(&self) -> Result<MemtableId, PoolExhausted> {
        if let Some(id) = self.free.lock().pop() {
            return Ok(MemtableId(id));
        }

        let mut next_new = self.next_new.lock();
        if *next_new >= self.capacity {
            return Err(PoolExhausted { capacity: self.capacity });
        }
        let id = *next_new;
        *next_new += 1;
        Ok(MemtableId(id))
    }

    pub fn release(&self, id: MemtableId) {
        self.free.lock().push(id.as_u32());
    }
}

#[derive(Debug, Error)]
#[error("memtable id pool exhausted: all {capacity} ids are live")]
pub struct PoolExhausted {
    pub capacity: u32,
}
