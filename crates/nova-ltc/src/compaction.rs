use std::sync::Arc;

use nova_format::{EntryType, InternalKey, InternalKeyComparator, SequenceNumber};
use seekable_iterator::Comparator as _;

use crate::file_meta::{FileMetaData, Level};
use crate::version::Version;

/// Target size of one compaction output file, 2 MiB.
pub const TARGET_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Grandparent-level overlap, in bytes, a compaction output may accumulate before
/// `should_stop_before` forces a new output file (the "20 MiB" example).
pub const MAX_GRANDPARENT_OVERLAP_BYTES: u64 = 20 * 1024 * 1024;

/// A level may be re-expanded past its single starting file as long as the expanded input set
/// stays under this many bytes and pulls in no additional level+1 files.
pub const EXPANDED_COMPACTION_BYTE_SIZE_LIMIT: u64 = 25 * TARGET_FILE_SIZE;

/// A planned compaction: inputs at `level` and `level + 1`, plus the `level + 2` grandparent
/// files used only to bound output file size.
#[derive(Debug)]
pub struct Compaction {
    pub level:        Level,
    pub level_inputs:     Vec<Arc<FileMetaData>>,
    pub next_level_inputs: Vec<Arc<FileMetaData>>,
    pub grandparents:     Vec<Arc<FileMetaData>>,
    grandparent_index:    usize,
    accumulated_overlap:  u64,
    seen_output_key:      bool,
}

impl Compaction {
    /// A compaction that moves a single file to `level + 1` untouched: no overlap at the next
    /// level, and the grandparent bound wouldn't be exceeded by the move.
    #[must_use]
    pub fn is_trivial_move(&self) -> bool {
        self.level_inputs.len() == 1
            && self.next_level_inputs.is_empty()
            && grandparent_overlap_bytes(&self.grandparents) <= MAX_GRANDPARENT_OVERLAP_BYTES
    }

    /// Call once per output key, in increasing internal-key order, while building compaction
    /// output. Returns `true` when the accumulated grandparent overlap since the last output
    /// file has crossed `MAX_GRANDPARENT_OVERLAP_BYTES`, meaning the caller should close the
    /// current output file and start a new one before writing this key (scenario S4).
    pub fn should_stop_before(&mut self, internal_key: &[u8]) -> bool {
        let cmp = InternalKeyComparator;

        while self.grandparent_index < self.grandparents.len()
            && cmp.cmp(internal_key, &self.grandparents[self.grandparent_index].largest().encode()).is_gt()
        {
            if self.seen_output_key {
                self.accumulated_overlap += self.grandparents[self.grandparent_index].file_size();
            }
            self.grandparent_index += 1;
        }
        self.seen_output_key = true;

        if self.accumulated_overlap > MAX_GRANDPARENT_OVERLAP_BYTES {
            self.accumulated_overlap = 0;
            return true;
        }
        false
    }

    /// Splits `entries` (ascending internal-key order, already merged and collapsed by
    /// [`merge_and_collapse`]) into output-file-sized groups: starts a new group whenever the
    /// current one has reached `TARGET_FILE_SIZE` or [`Self::should_stop_before`] reports the
    /// grandparent overlap bound crossed. Calls `should_stop_before` once per entry, in order,
    /// as required by that method's contract.
    #[must_use]
    pub fn partition_into_outputs(&mut self, entries: Vec<(InternalKey, Vec<u8>)>) -> Vec<Vec<(InternalKey, Vec<u8>)>> {
        let mut outputs = Vec::new();
        let mut current: Vec<(InternalKey, Vec<u8>)> = Vec::new();
        let mut current_size: u64 = 0;

        for (key, value) in entries {
            let stop = self.should_stop_before(&key.encode());
            if !current.is_empty() && (stop || current_size >= TARGET_FILE_SIZE) {
                outputs.push(std::mem::take(&mut current));
                current_size = 0;
            }
            current_size += key.encoded_len() as u64 + value.len() as u64;
            current.push((key, value));
        }
        if !current.is_empty() {
            outputs.push(current);
        }
        outputs
    }
}

/// Merge-sorts `inputs` (each already in ascending internal-key order) into one ascending
/// sequence, keeping only the newest entry per user key and dropping tombstones whose sequence
/// number is at or below `oldest_live_sequence`: nothing that can still read the database could
/// observe a deletion that old, so the tombstone itself becomes dead weight.
#[must_use]
pub fn merge_and_collapse(
    inputs:              Vec<Vec<(InternalKey, Vec<u8>)>>,
    oldest_live_sequence: SequenceNumber,
) -> Vec<(InternalKey, Vec<u8>)> {
    let cmp = InternalKeyComparator;
    let mut all: Vec<(InternalKey, Vec<u8>)> = inputs.into_iter().flatten().collect();
    all.sort_by(|a, b| cmp.compare_keys(&a.0, &b.0));

    let mut out = Vec::with_capacity(all.len());
    let mut last_user_key: Option<Vec<u8>> = None;
    for (key, value) in all {
        if last_user_key.as_deref() == Some(key.user_key.as_slice()) {
            // A newer entry for this user key already won and was emitted below.
            continue;
        }
        last_user_key = Some(key.user_key.clone());

        if key.entry_type == EntryType::Deletion && key.sequence <= oldest_live_sequence {
            continue;
        }
        out.push((key, value));
    }
    out
}

fn grandparent_overlap_bytes(grandparents: &[Arc<FileMetaData>]) -> u64 {
    grandparents.iter().map(|f| f.file_size()).sum()
}

fn key_range(files: &[Arc<FileMetaData>]) -> Option<(InternalKey, InternalKey)> {
    let cmp = InternalKeyComparator;
    files.iter().fold(None, |acc, f| match acc {
        None => Some((f.smallest().clone(), f.largest().clone())),
        Some((smallest, largest)) => {
            let smallest = if cmp.cmp(&f.smallest().encode(), &smallest.encode()).is_lt() {
                f.smallest().clone()
            } else {
                smallest
            };
            let largest = if cmp.cmp(&f.largest().encode(), &largest.encode()).is_gt() {
                f.largest().clone()
            } else {
                largest
            };
            Some((smallest, largest))
        }
    })
}

fn files_overlapping_range(files: &[Arc<FileMetaData>], smallest: &InternalKey, largest: &InternalKey) -> Vec<Arc<FileMetaData>> {
    let cmp = InternalKeyComparator;
    files
        .iter()
        .filter(|f| {
            cmp.cmp(&f.smallest().encode(), &largest.encode()).is_le()
                && cmp.cmp(&smallest.encode(), &f.largest().encode()).is_le()
        })
        .cloned()
        .collect()
}

/// Picks the next compaction for `version`, given each level's resume key
/// (`compact_pointers[level]`, `None` meaning "start from the first file"). A level scores >=1
/// by file count (L0) or byte total (L>=1); ties are broken by the first file whose
/// `allowed_seeks` budget is exhausted. Returns `None` if nothing needs compacting.
#[must_use]
pub fn pick_compaction(version: &Version, compact_pointers: &[Option<InternalKey>], seek_compaction: Option<(Level, Arc<FileMetaData>)>) -> Option<Compaction> {
    let (level, mut level_inputs) = if version.compaction_score() >= 1.0 {
        let level = version.compaction_level()?;
        (level, pick_level_inputs(version, level, compact_pointers.get(level.as_usize()).and_then(Option::as_ref)))
    } else if let Some((level, file)) = seek_compaction {
        (level, vec![file])
    } else {
        return None;
    };

    if level == Level::ZERO {
        // L0 files can overlap each other; re-expand to pull in every L0 file overlapping the
        // combined range before computing the level+1 input set.
        let (smallest, largest) = key_range(&level_inputs).expect("pick_level_inputs never returns empty for a scored level");
        level_inputs = files_overlapping_range(version.files(Level::ZERO), &smallest, &largest);
    }

    let (smallest, largest) = key_range(&level_inputs)?;
    let Some(next_level) = level.next() else {
        return Some(finish_compaction(version, level, level_inputs, Vec::new(), &smallest, &largest));
    };

    let mut next_level_inputs = files_overlapping_range(version.files(next_level), &smallest, &largest);

    let (expanded_smallest, expanded_largest) = key_range(&level_inputs.iter().cloned().chain(next_level_inputs.iter().cloned()).collect::<Vec<_>>())
        .unwrap_or_else(|| (smallest.clone(), largest.clone()));
    let expanded_level_inputs = files_overlapping_range(version.files(level), &expanded_smallest, &expanded_largest);

    if expanded_level_inputs.len() > level_inputs.len() {
        let expanded_next_level_inputs = files_overlapping_range(version.files(next_level), &expanded_smallest, &expanded_largest);
        let expanded_bytes: u64 = expanded_level_inputs.iter().chain(expanded_next_level_inputs.iter()).map(|f| f.file_size()).sum();

        if expanded_next_level_inputs.len() == next_level_inputs.len() && expanded_bytes < EXPANDED_COMPACTION_BYTE_SIZE_LIMIT {
            level_inputs = expanded_level_inputs;
            next_level_inputs = expanded_next_level_inputs;
        }
    }

    let (final_smallest, final_largest) = key_range(&level_inputs.iter().cloned().chain(next_level_inputs.iter().cloned()).collect::<Vec<_>>())
        .unwrap_or((smallest, largest));

    Some(finish_compaction(version, level, level_inputs, next_level_inputs, &final_smallest, &final_largest))
}

fn finish_compaction(
    version:  &Version,
    level:    Level,
    level_inputs:      Vec<Arc<FileMetaData>>,
    next_level_inputs: Vec<Arc<FileMetaData>>,
    smallest: &InternalKey,
    largest:  &InternalKey,
) -> Compaction {
    let grandparents = level
        .next()
        .and_then(Level::next)
        .map(|grandparent_level| files_overlapping_range(version.files(grandparent_level), smallest, largest))
        .unwrap_or_default();

    Compaction {
        level,
        level_inputs,
        next_level_inputs,
        grandparents,
        grandparent_index: 0,
        accumulated_overlap: 0,
        seen_output_key: false,
    }
}

fn pick_level_inputs(version: &Version, level: Level, resume_after: Option<&InternalKey>) -> Vec<Arc<FileMetaData>> {
    let files = version.files(level);
    if files.is_empty() {
        return Vec::new();
    }

    let cmp = InternalKeyComparator;
    let start = resume_after.map_or(0, |pointer| {
        files
            .iter()
            .position(|f| cmp.cmp(&f.largest().encode(), &pointer.encode()).is_gt())
            .unwrap_or(0)
    });

    if level == Level::ZERO {
        files.to_vec()
    } else {
        files.get(start).into_iter().cloned().collect()
    }
}

/// A maximal set of compactions whose key ranges are pairwise disjoint across their levels, so
/// several compaction workers can run them concurrently without racing on the same files.
/// Greedy: later candidates are dropped if they touch any level a
/// previously accepted compaction already touches within an overlapping range.
#[must_use]
pub fn compute_non_overlapping_set(candidates: Vec<Compaction>) -> Vec<Compaction> {
    let mut accepted: Vec<Compaction> = Vec::new();

    'candidates: for candidate in candidates {
        for other in &accepted {
            if candidate.level == other.level || candidate.level == other.level.next().unwrap_or(candidate.level) {
                if ranges_overlap(&candidate.level_inputs, &other.level_inputs)
                    || ranges_overlap(&candidate.level_inputs, &other.next_level_inputs)
                    || ranges_overlap(&candidate.next_level_inputs, &other.level_inputs)
                {
                    continue 'candidates;
                }
            }
        }
        accepted.push(candidate);
    }

    assert_non_overlapping_set(&accepted);
    accepted
}

fn ranges_overlap(a: &[Arc<FileMetaData>], b: &[Arc<FileMetaData>]) -> bool {
    a.iter().any(|fa| b.iter().any(|fb| fa.overlaps(fb)))
}

/// Debug-only invariant check backing [`compute_non_overlapping_set`]: panics if any two
/// accepted compactions share an overlapping file range at the same or adjacent level.
fn assert_non_overlapping_set(compactions: &[Compaction]) {
    for (i, a) in compactions.iter().enumerate() {
        for b in &compactions[i + 1..] {
            assert!(
                !(a.level == b.level && ranges_overlap(&a.level_inputs, &b.level_inputs)),
                "compute_non_overlapping_set produced overlapping compactions at the same level",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use nova_format::{EntryType, SequenceNumber};

    use super::*;
    use crate::file_meta::NUM_LEVELS;

    fn key(user_key: &str, seq: u64) -> InternalKey {
        InternalKey::new(user_key.as_bytes(), SequenceNumber::new_usable(seq).unwrap(), EntryType::Value)
    }

    fn version_with(level: usize, files: Vec<FileMetaData>) -> Version {
        let mut all: [Vec<Arc<FileMetaData>>; NUM_LEVELS] = Default::default();
        all[level] = files.into_iter().map(Arc::new).collect();
        Version::new(0, all)
    }

    #[test]
    fn trivial_move_when_next_level_is_empty() {
        let version = version_with(2, vec![FileMetaData::new(42, 10, key("a", 1), key("m", 1))]);
        let compaction = pick_compaction(&version, &[None, None, None, None, None, None, None], Some((Level::new(2).unwrap(), Arc::new(FileMetaData::new(42, 10, key("a", 1), key("m", 1)))))).unwrap();

        assert!(compaction.is_trivial_move());
        assert_eq!(compaction.level, Level::new(2).unwrap());
        assert_eq!(compaction.next_level_inputs.len(), 0);
    }

    #[test]
    fn should_stop_before_fires_once_overlap_exceeds_bound() {
        let grandparents: Vec<Arc<FileMetaData>> = (0..15)
            .map(|i| {
                let lo = format!("k{i:03}");
                let hi = format!("k{:03}", i + 1);
                Arc::new(FileMetaData::new(i, 2 * 1024 * 1024, key(&lo, 1), key(&hi, 1)))
            })
            .collect();

        let mut compaction = Compaction {
            level: Level::ZERO,
            level_inputs: Vec::new(),
            next_level_inputs: Vec::new(),
            grandparents,
            grandparent_index: 0,
            accumulated_overlap: 0,
            seen_output_key: false,
        };

        let mut stopped = false;
        for i in 0..15 {
            let probe = key(&format!("k{:03}", i + 1), 1).encode();
            if compaction.should_stop_before(&probe) {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
    }

    #[test]
    fn compute_non_overlapping_set_drops_conflicting_candidates() {
        let version = version_with(1, vec![
            FileMetaData::new(1, 10, key("a", 1), key("m", 1)),
            FileMetaData::new(2, 10, key("n", 1), key("z", 1)),
        ]);

        let no_pointers: [Option<InternalKey>; NUM_LEVELS] = Default::default();
        let a = pick_compaction(&version, &no_pointers, Some((Level::new(1).unwrap(), Arc::new(FileMetaData::new(1, 10, key("a", 1), key("m", 1)))))).unwrap();
        let b = pick_compaction(&version, &no_pointers, Some((Level::new(1).unwrap(), Arc::new(FileMetaData::new(1, 10, key("a", 1), key("m", 1)))))).unwrap();

        let set = compute_non_overlapping_set(vec![a, b]);
        assert_eq!(set.len(), 1);
    }
}
