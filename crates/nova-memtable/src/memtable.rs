use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use anchored_skiplist::{threadsafe::ThreadsafeSkiplist, Skiplist as _};
use clone_behavior::{IndependentClone, MirroredClone, NearInstant, NonRecursive};
use nova_format::{EntryType, InternalKey, InternalKeyComparator, SequenceNumber};
use seekable_iterator::{CursorIterator as _, Seekable as _};

use crate::id_pool::MemtableId;

/// Wraps [`InternalKeyComparator`] to compare skiplist entries rather than bare internal keys.
/// Each entry is `[4-byte LE key_len][key bytes][4-byte LE value_len][value bytes]`; only the key
/// portion participates in ordering, so two entries with the same key but different values (which
/// never happens in practice, since key already embeds a unique sequence number) would still
/// compare equal.
#[derive(Debug, Clone, Copy, Default)]
struct MemtableEntryComparator(InternalKeyComparator);

impl MemtableEntryComparator {
    fn key_slice(entry: &[u8]) -> &[u8] {
        let key_len = u32::from_le_bytes(entry[..4].try_into().expect("entry carries a 4-byte key_len prefix"));
        &entry[4..4 + key_len as usize]
    }
}

impl seekable_iterator::Comparator<[u8]> for MemtableEntryComparator {
    fn cmp(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.0.cmp(Self::key_slice(a), Self::key_slice(b))
    }
}

impl NonRecursive for MemtableEntryComparator {}

impl IndependentClone<NearInstant> for MemtableEntryComparator {
    #[inline]
    fn independent_clone(&self) -> Self {
        *self
    }
}

impl MirroredClone<NearInstant> for MemtableEntryComparator {
    #[inline]
    fn mirrored_clone(&self) -> Self {
        *self
    }
}

fn encode_entry(key: &InternalKey, value: &[u8]) -> Vec<u8> {
    let key = key.encode();
    let mut out = Vec::with_capacity(8 + key.len() + value.len());
    out.extend_from_slice(&u32::try_from(key.len()).expect("internal keys stay well under 4 GiB").to_le_bytes());
    out.extend_from_slice(&key);
    out.extend_from_slice(&u32::try_from(value.len()).expect("values stay well under 4 GiB").to_le_bytes());
    out.extend_from_slice(value);
    out
}

fn decode_entry(entry: &[u8]) -> (InternalKey, Vec<u8>) {
    let key_len = u32::from_le_bytes(entry[..4].try_into().expect("entry carries a 4-byte key_len prefix")) as usize;
    let key = InternalKey::decode(&entry[4..4 + key_len]).expect("memtable only ever holds validly encoded entries");
    let value_start = 4 + key_len + 4;
    let value_len = u32::from_le_bytes(
        entry[4 + key_len..value_start].try_into().expect("entry carries a 4-byte value_len prefix"),
    ) as usize;
    let value = entry[value_start..value_start + value_len].to_vec();
    (key, value)
}

/// An arena-backed skiplist of internal keys and their values (`MemTable`), identified
/// by a pool-drawn [`MemtableId`]. Cheap to clone: every clone shares the same underlying
/// skiplist and byte counter, which is how readers and the DB's own write pointer each get an
/// independent handle to the same data.
#[derive(Debug)]
pub struct Memtable {
    id:           MemtableId,
    list:         ThreadsafeSkiplist<MemtableEntryComparator>,
    approx_bytes: Arc<AtomicUsize>,
}

impl Memtable {
    #[must_use]
    pub fn new(id: MemtableId) -> Self {
        Self {
            id,
            list:         ThreadsafeSkiplist::new(MemtableEntryComparator::default()),
            approx_bytes: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn id(&self) -> MemtableId {
        self.id
    }

    /// Another handle to the same underlying skiplist.
    #[must_use]
    pub fn refcounted_clone(&self) -> Self {
        Self {
            id:           self.id,
            list:         self.list.refcounted_clone(),
            approx_bytes: Arc::clone(&self.approx_bytes),
        }
    }

    /// Inserts an internal key and its value. Returns `false` if an entry that compares equal
    /// (same user key and sequence number) is already present.
    pub fn put(&mut self, key: &InternalKey, value: &[u8]) -> bool {
        let encoded = encode_entry(key, value);
        let len = encoded.len();
        let inserted = self.list.insert_with(len, |entry| entry.copy_from_slice(&encoded));
        if inserted {
            self.approx_bytes.fetch_add(len, AtomicOrdering::Relaxed);
        }
        inserted
    }

    /// Looks up the entry for `user_key` visible at `sequence`: the entry with that user key and
    /// the greatest sequence number not exceeding `sequence`, if any. Returns the decoded key
    /// (so callers can see whether it's a tombstone) and its value.
    #[must_use]
    pub fn get(&self, user_key: &[u8], sequence: SequenceNumber) -> Option<(InternalKey, Vec<u8>)> {
        let target_key = InternalKey::new(user_key, sequence, EntryType::MAX_TYPE);
        let target = encode_entry(&target_key, &[]);

        let mut iter = self.list.iter();
        iter.seek(&target);
        let entry = iter.current()?;
        let (found_key, value) = decode_entry(entry);

        (found_key.user_key == user_key).then_some((found_key, value))
    }

    /// All entries in ascending internal-key order, decoded. Used to flush a sealed memtable's
    /// full contents into an SSTable buffer.
    #[must_use]
    pub fn entries(&self) -> Vec<(InternalKey, Vec<u8>)> {
        (&self.list).into_iter().map(decode_entry).collect()
    }

    /// A close lower bound on the number of bytes this memtable has accepted via `put`, used to
    /// decide when to seal it ("sealed when its arena exceeds `write_buffer_size`").
    #[must_use]
    pub fn approx_memory_usage(&self) -> usize {
        self.approx_bytes.load(AtomicOrdering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approx_memory_usage() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: u64) -> SequenceNumber {
        SequenceNumber::new_usable(n).unwrap()
    }

    #[test]
    fn get_returns_the_newest_visible_entry() {
        let mut table = Memtable::new(MemtableId::from_raw(0));
        table.put(&InternalKey::new(b"k".to_vec(), seq(1), EntryType::Value), b"v1");
        table.put(&InternalKey::new(b"k".to_vec(), seq(3), EntryType::Value), b"v3");
        table.put(&InternalKey::new(b"k".to_vec(), seq(5), EntryType::Deletion), b"");

        let (found, value) = table.get(b"k", seq(4)).unwrap();
        assert_eq!(found.sequence, seq(3));
        assert_eq!(found.entry_type, EntryType::Value);
        assert_eq!(value, b"v3");

        let (found, _) = table.get(b"k", seq(5)).unwrap();
        assert_eq!(found.sequence, seq(5));
        assert_eq!(found.entry_type, EntryType::Deletion);
    }

    #[test]
    fn get_misses_absent_keys() {
        let mut table = Memtable::new(MemtableId::from_raw(0));
        table.put(&InternalKey::new(b"a".to_vec(), seq(1), EntryType::Value), b"v");
        assert!(table.get(b"zzz", seq(1)).is_none());
    }

    #[test]
    fn entries_are_returned_in_ascending_order() {
        let mut table = Memtable::new(MemtableId::from_raw(0));
        table.put(&InternalKey::new(b"b".to_vec(), seq(1), EntryType::Value), b"b1");
        table.put(&InternalKey::new(b"a".to_vec(), seq(1), EntryType::Value), b"a1");
        table.put(&InternalKey::new(b"a".to_vec(), seq(2), EntryType::Value), b"a2");

        let entries = table.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0.user_key, b"a");
        assert_eq!(entries[0].0.sequence, seq(2));
        assert_eq!(entries[0].1, b"a2");
        assert_eq!(entries[1].0.user_key, b"a");
        assert_eq!(entries[1].0.sequence, seq(1));
        assert_eq!(entries[2].0.user_key, b"b");
    }

    #[test]
    fn refcounted_clones_share_writes() {
        let mut table = Memtable::new(MemtableId::from_raw(0));
        let reader = table.refcounted_clone();

        table.put(&InternalKey::new(b"k".to_vec(), seq(1), EntryType::Value), b"v");

        assert!(reader.get(b"k", seq(1)).is_some());
        assert_eq!(reader.approx_memory_usage(), table.approx_memory_usage());
    }
}
