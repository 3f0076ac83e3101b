use parking_lot::Mutex;

use crate::memtable::Memtable;

/// Outcome of [`AtomicMemTable::acquire_ref`] (`Ref(id) -> (memtable, l0_fn)`).
#[derive(Debug)]
pub enum RefOutcome {
    /// The memtable is still live; the caller holds an additional reference.
    Live(Memtable),
    /// The memtable has already been flushed; the caller should fall back to the L0 file.
    Flushed(u64),
    /// The slot is empty: nothing has ever been published into it, or it has already been
    /// fully torn down.
    Vacant,
}

struct Occupied {
    // `None` once flushed: the memtable itself has been handed off to readers who already hold
    // their own clones, and this slot no longer needs to keep one alive.
    memtable:   Option<Memtable>,
    flushed_to: Option<u64>,
    refs:       u32,
}

enum SlotState {
    Empty,
    Occupied(Occupied),
}

/// A slot holding either a live memtable or the L0 file number it was flushed to, guarded by a
/// single lock. Observable transitions:
/// `Empty -> Live(m) -> Flushed(fn) -> Empty`.
pub struct AtomicMemTable {
    state: Mutex<SlotState>,
}

impl Default for AtomicMemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicMemTable {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(SlotState::Empty) }
    }

    /// Step 1 of the protocol: publishes a freshly created memtable with a refcount of 1 (the
    /// DB's own write pointer).
    ///
    /// # Panics
    /// If the slot is not currently empty.
    pub fn publish(&self, memtable: Memtable) {
        let mut state = self.state.lock();
        assert!(matches!(*state, SlotState::Empty), "AtomicMemTable::publish called on a non-empty slot");
        *state = SlotState::Occupied(Occupied { memtable: Some(memtable), flushed_to: None, refs: 1 });
    }

    /// Step 2: acquires a reference under the slot lock, incrementing the refcount if the
    /// memtable is still live.
    pub fn acquire_ref(&self) -> RefOutcome {
        let mut state = self.state.lock();
        match &mut *state {
            SlotState::Empty => RefOutcome::Vacant,
            SlotState::Occupied(slot) => {
                slot.refs += 1;
                match &slot.memtable {
                    Some(memtable) => RefOutcome::Live(memtable.refcounted_clone()),
                    None => RefOutcome::Flushed(
                        slot.flushed_to.expect("memtable is None only once flushed_to is set"),
                    ),
                }
            }
        }
    }

    /// Step 4 (first half): marks the slot flushed, recording the L0 file the memtable's
    /// contents now live in. The slot's own memtable handle is dropped; readers who already
    /// hold a `Ref` keep using their own clone until they `unref`.
    ///
    /// # Panics
    /// If the slot is empty or already flushed.
    pub fn set_flushed(&self, l0_file_number: u64) {
        let mut state = self.state.lock();
        let SlotState::Occupied(slot) = &mut *state else {
            panic!("AtomicMemTable::set_flushed called on an empty slot");
        };
        assert!(slot.flushed_to.is_none(), "AtomicMemTable::set_flushed called twice");
        slot.memtable = None;
        slot.flushed_to = Some(l0_file_number);
    }

    /// Releases a reference acquired via `publish` (the write ref) or `acquire_ref`. Once the
    /// refcount reaches zero on a flushed slot, the slot vacates and its id can be reused.
    ///
    /// # Panics
    /// If called on an empty slot, or if the refcount would underflow: both are protocol
    /// violations by the caller, fatal to the process rather than a recoverable `Result`.
    pub fn unref(&self) {
        let mut state = self.state.lock();
        let SlotState::Occupied(slot) = &mut *state else {
            panic!("AtomicMemTable::unref called on an empty slot");
        };
        slot.refs = slot.refs.checked_sub(1).expect("AtomicMemTable refcount underflow");

        if slot.refs == 0 && slot.flushed_to.is_some() {
            *state = SlotState::Empty;
        }
    }

    /// `true` once `set_flushed` has been called and the slot hasn't since vacated.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        matches!(&*self.state.lock(), SlotState::Occupied(slot) if slot.flushed_to.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(&*self.state.lock(), SlotState::Empty)
    }
}
