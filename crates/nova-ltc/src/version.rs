use std::sync::Arc;

use nova_format::{InternalKey, InternalKeyComparator, SequenceNumber};
use seekable_iterator::Comparator as _;

use crate::file_meta::{FileMetaData, Level, NUM_LEVELS};

/// Per-level base size, in bytes, before level `l` is considered overfull ("L>=1 by total
/// bytes / level-bound"). Level 1 is 10 MiB; each level multiplies by 10.
#[must_use]
pub fn max_bytes_for_level(level: Level) -> u64 {
    let mut result: u64 = 10 * 1024 * 1024;
    for _ in 1..level.as_usize() {
        result *= 10;
    }
    result
}

/// Number of L0 files at or above which L0's compaction score reaches 1.0.
pub const L0_COMPACTION_TRIGGER: usize = 4;

/// An immutable snapshot of per-level file sets (`Version`). Cheaply cloned: every
/// file is held behind an `Arc`, so producing the next version after a `VersionEdit` only clones
/// the per-level vectors, not the `FileMetaData`s themselves.
#[derive(Debug, Clone)]
pub struct Version {
    version_id:        u32,
    files:             [Vec<Arc<FileMetaData>>; NUM_LEVELS],
    compaction_score:  f64,
    compaction_level:  Option<Level>,
}

impl Version {
    #[must_use]
    pub fn new(version_id: u32, files: [Vec<Arc<FileMetaData>>; NUM_LEVELS]) -> Self {
        let mut version = Self { version_id, files, compaction_score: 0.0, compaction_level: None };
        version.finalize();
        version
    }

    #[must_use]
    pub const fn version_id(&self) -> u32 {
        self.version_id
    }

    #[must_use]
    pub fn files(&self, level: Level) -> &[Arc<FileMetaData>] {
        &self.files[level.as_usize()]
    }

    #[must_use]
    pub fn total_bytes(&self, level: Level) -> u64 {
        self.files(level).iter().map(|f| f.file_size()).sum()
    }

    #[must_use]
    pub fn compaction_score(&self) -> f64 {
        self.compaction_score
    }

    #[must_use]
    pub fn compaction_level(&self) -> Option<Level> {
        self.compaction_level
    }

    /// Recomputes `compaction_score`/`compaction_level`, the highest-scoring level across L0
    /// (file count over `L0_COMPACTION_TRIGGER`) and L≥1 (total bytes over
    /// `max_bytes_for_level`). Called once after construction; a `Version` never mutates
    /// afterward, so this never needs to run again for the same snapshot.
    fn finalize(&mut self) {
        let mut best_score = 0.0;
        let mut best_level = None;

        for level in Level::all() {
            #[expect(clippy::cast_precision_loss, reason = "file counts/byte totals never approach f64's precision limit")]
            let score = if level == Level::ZERO {
                self.files(level).len() as f64 / L0_COMPACTION_TRIGGER as f64
            } else {
                self.total_bytes(level) as f64 / max_bytes_for_level(level) as f64
            };

            if score > best_score {
                best_score = score;
                best_level = Some(level);
            }
        }

        self.compaction_score = best_score;
        self.compaction_level = best_level;
    }

    /// Files a `Get` for `user_key` at `sequence` should probe, in the order they should be
    /// probed (lookup path, minus the actual SSTable block read, which is out of
    /// scope here): all L0 files whose range could hold the key, newest file number first
    /// (L0 ranges may overlap), then for each level ≥1 the single file whose range contains the
    /// key, found by binary search since those levels are kept sorted and non-overlapping
    /// (invariant 1).
    #[must_use]
    pub fn files_covering(&self, user_key: &[u8], sequence: SequenceNumber) -> Vec<Arc<FileMetaData>> {
        let probe = InternalKey::new(user_key, sequence, nova_format::EntryType::MAX_TYPE).encode();
        let cmp = InternalKeyComparator;
        let mut candidates = Vec::new();

        let mut l0: Vec<&Arc<FileMetaData>> = self
            .files(Level::ZERO)
            .iter()
            .filter(|f| cmp.cmp(&f.smallest().encode(), &probe).is_le())
            .collect();
        l0.sort_by(|a, b| b.file_number().cmp(&a.file_number()));
        candidates.extend(l0.into_iter().cloned());

        for level in Level::all().skip(1) {
            let files = self.files(level);
            let idx = files.partition_point(|f| cmp.cmp(&f.largest().encode(), &probe).is_lt());
            if let Some(file) = files.get(idx) {
                if cmp.cmp(&file.smallest().encode(), &probe).is_le() {
                    candidates.push(Arc::clone(file));
                }
            }
        }

        candidates
    }

    /// The lowest level whose range does not overlap `key_range`: the level a freshly flushed
    /// memtable's L0 file could be pushed straight into without any compaction. Never returns a
    /// level beyond 2: pushing further risks starving later compactions of a cheap merge target.
    #[must_use]
    pub fn level_for_compacted_memtable(&self, smallest: &InternalKey, largest: &InternalKey) -> Level {
        let mut level = Level::ZERO;
        if self.overlaps_level(Level::ZERO, smallest, largest) {
            return level;
        }

        const MAX_MEM_COMPACT_LEVEL: usize = 2;
        while level.as_usize() < MAX_MEM_COMPACT_LEVEL {
            let Some(next) = level.next() else { break };
            if self.overlaps_level(next, smallest, largest) {
                break;
            }
            level = next;
        }
        level
    }

    fn overlaps_level(&self, level: Level, smallest: &InternalKey, largest: &InternalKey) -> bool {
        let cmp = InternalKeyComparator;
        self.files(level).iter().any(|f| {
            cmp.cmp(&f.smallest().encode(), &largest.encode()).is_le()
                && cmp.cmp(&smallest.encode(), &f.largest().encode()).is_le()
        })
    }
}
