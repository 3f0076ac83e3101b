//! The LTC's slab-class memory manager (component C1).
//!
//! Every fixed-size item the LTC hands out (memtable arena chunks, read/write slab buffers
//! handed to `nova-remote-fs`) is rounded up to a [`SizeClasses`] entry and served from a
//! per-class free list, so that repeated allocation and freeing of similarly-sized buffers
//! doesn't thrash the global allocator. The literal slab-carving (one big `mmap`'d region
//! sliced into items) is left out of scope: each class's free list is an
//! [`anchored_pool::SharedUnboundedBufferPool`], and a single global byte budget stands in
//! for the fixed pool of raw slabs.

mod size_classes;

pub use size_classes::{InvalidSizeClasses, SizeClasses};

use std::sync::atomic::{AtomicUsize, Ordering};

use anchored_pool::{PooledBuffer, SharedUnboundedBufferPool};
use parking_lot::Mutex;
use thiserror::Error;

/// A slab item checked out of a [`SlabMemoryManager`]. Returned to its class's free list when
/// dropped.
pub type SlabItem = PooledBuffer<SharedUnboundedBufferPool>;

struct SlabClass {
    size: usize,
    pool: SharedUnboundedBufferPool,
    // Serializes the "would this get() grow the pool" check against the global budget so two
    // threads can't both observe an empty free list and double-spend the same budget bytes.
    growth_lock: Mutex<()>,
}

/// Carves a fixed global byte budget into per-size-class free lists.
///
/// `thread_id` is accepted on the allocation path for parity with `NovaMemManager`'s
/// `(thread_id, size_class_id)` addressing and so call sites can tag `tracing` spans with it;
/// this implementation does not shard free lists per thread, since the underlying
/// [`SharedUnboundedBufferPool`] is already safe to share across threads without contention
/// proportional to a separate per-thread free list.
pub struct SlabMemoryManager {
    classes:          SizeClasses,
    slab_classes:     Vec<SlabClass>,
    remaining_budget: AtomicUsize,
}

impl SlabMemoryManager {
    #[must_use]
    pub fn new(classes: SizeClasses, total_budget_bytes: usize) -> Self {
        let slab_classes = (0..classes.num_classes())
            .map(|class_id| {
                let size = classes.class_size(class_id).expect("class_id < num_classes");
                SlabClass {
                    size,
                    pool:        SharedUnboundedBufferPool::new(size),
                    growth_lock: Mutex::new(()),
                }
            })
            .collect();

        Self {
            classes,
            slab_classes,
            remaining_budget: AtomicUsize::new(total_budget_bytes),
        }
    }

    #[must_use]
    pub fn size_class_id(&self, requested_size: usize) -> Option<usize> {
        self.classes.class_for(requested_size)
    }

    #[must_use]
    pub fn remaining_budget(&self) -> usize {
        self.remaining_budget.load(Ordering::Relaxed)
    }

    /// Checks out an item of at least `requested_size` bytes, zero-filled up to its class's
    /// size. `thread_id` is used only for observability (`tracing` fields).
    pub fn item_alloc(&self, thread_id: usize, requested_size: usize) -> Result<SlabItem, OutOfMemory> {
        let class_id = self.size_class_id(requested_size)
            .ok_or(OutOfMemory::NoSuitableClass { requested_size })?;
        #[expect(clippy::indexing_slicing, reason = "class_id came from self.classes just above")]
        let class = &self.slab_classes[class_id];

        let mut buffer = {
            let _growth_guard = class.growth_lock.lock();
            if class.pool.available_buffers() == 0 {
                self.reserve_budget(class.size)?;
            }
            class.pool.get()
        };

        if buffer.len() < class.size {
            buffer.resize(class.size, 0);
        }

        tracing::trace!(thread_id, class_id, size = class.size, "slab item allocated");
        Ok(buffer)
    }

    fn reserve_budget(&self, amount: usize) -> Result<(), OutOfMemory> {
        let mut current = self.remaining_budget.load(Ordering::Relaxed);
        loop {
            if current < amount {
                return Err(OutOfMemory::BudgetExhausted {
                    requested: amount,
                    remaining: current,
                });
            }
            match self.remaining_budget.compare_exchange_weak(
                current,
                current - amount,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_)          => return Ok(()),
                Err(observed)  => current = observed,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum OutOfMemory {
    #[error("no slab class is large enough for a {requested_size}-byte item")]
    NoSuitableClass { requested_size: usize },
    #[error("slab budget exhausted: wanted {requested} more bytes but only {remaining} remain")]
    BudgetExhausted { requested: usize, remaining: usize },
}
