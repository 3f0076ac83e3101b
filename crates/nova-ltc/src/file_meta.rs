use std::sync::atomic::{AtomicU32, Ordering};

use nova_format::{InternalKey, InternalKeyComparator};
use seekable_iterator::Comparator as _;

/// Upper bound on the number of levels in a `Version` ("up to `kNumLevels`, typically
/// 7").
pub const NUM_LEVELS: usize = 7;

/// Default `allowed_seeks` for a freshly built file.
pub const DEFAULT_ALLOWED_SEEKS: u32 = 1 << 30;

/// A level index in `[0, NUM_LEVELS)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(level: usize) -> Option<Self> {
        (level < NUM_LEVELS).then(|| Self(u8::try_from(level).expect("NUM_LEVELS fits in u8")))
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::new(self.as_usize() + 1)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_LEVELS).map(|l| Self::new(l).expect("within NUM_LEVELS"))
    }
}

/// Metadata for an SSTable. `file_number` is unique within its owning DB;
/// `smallest <= largest` under the internal-key comparator; `file_size > 0`.
///
/// Shared ownership (the source's manual `refs` counter) is expressed with `Arc<FileMetaData>`
/// at the call site rather than a field here: a `Version`'s per-level vectors and the
/// `VersionSet`'s bookkeeping both hold clones of the same `Arc`, so the strong count already is
/// the live-reference count.
#[derive(Debug)]
pub struct FileMetaData {
    file_number:     u64,
    file_size:       u64,
    smallest:        InternalKey,
    largest:         InternalKey,
    remaining_seeks: AtomicU32,
}

impl FileMetaData {
    /// # Panics
    /// If `file_size == 0` or `smallest > largest` under the internal-key comparator.
    #[must_use]
    pub fn new(file_number: u64, file_size: u64, smallest: InternalKey, largest: InternalKey) -> Self {
        assert!(file_size > 0, "FileMetaData::new: file_size must be nonzero");
        assert!(
            InternalKeyComparator.cmp(&smallest.encode(), &largest.encode()).is_le(),
            "FileMetaData::new: smallest must not exceed largest",
        );

        Self {
            file_number,
            file_size,
            smallest,
            largest,
            remaining_seeks: AtomicU32::new(DEFAULT_ALLOWED_SEEKS),
        }
    }

    #[must_use]
    pub const fn file_number(&self) -> u64 {
        self.file_number
    }

    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub const fn smallest(&self) -> &InternalKey {
        &self.smallest
    }

    #[must_use]
    pub const fn largest(&self) -> &InternalKey {
        &self.largest
    }

    /// Records an unnecessary file seek. Returns `true` once this file has exhausted its
    /// `allowed_seeks` budget, meaning it should be picked for a seek-triggered compaction
    /// (tie-break rule).
    pub fn record_seek(&self) -> bool {
        let previous = self.remaining_seeks.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |remaining| Some(remaining.saturating_sub(1)),
        ).expect("the update closure always returns Some");
        previous <= 1
    }

    /// Whether this file's `allowed_seeks` budget is already exhausted, making it the
    /// tie-break compaction input when no level's score reaches 1.0.
    #[must_use]
    pub fn needs_seek_compaction(&self) -> bool {
        self.remaining_seeks.load(Ordering::Relaxed) == 0
    }

    /// Whether two files' key ranges overlap under the internal-key comparator.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let cmp = InternalKeyComparator;
        cmp.cmp(&self.smallest.encode(), &other.largest.encode()).is_le()
            && cmp.cmp(&other.smallest.encode(), &self.largest.encode()).is_le()
    }
}
