use std::cmp::Ordering;

use clone_behavior::{IndependentClone, MirroredClone, NearInstant, NonRecursive};
use thiserror::Error;

use crate::entry_type::{EntryType, InvalidEntryType};
use crate::sequence::SequenceNumber;

/// An owned `(user_key, sequence, entry_type)` triple, the unit of ordering throughout the
/// LTC: memtables, SSTables, and the version set all compare entries as internal keys rather
/// than raw user keys.
///
/// The encoded form is `user_key_bytes ++ tag`, where `tag` is a little-endian `u64` packing
/// the sequence number in the upper 56 bits and the entry type in the lowest 8 bits. This
/// mirrors LevelDB's internal key layout so that a bytewise comparison of the tag alone already
/// orders by sequence number descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    pub user_key:   Vec<u8>,
    pub sequence:   SequenceNumber,
    pub entry_type: EntryType,
}

impl InternalKey {
    #[must_use]
    pub fn new(user_key: impl Into<Vec<u8>>, sequence: SequenceNumber, entry_type: EntryType) -> Self {
        Self { user_key: user_key.into(), sequence, entry_type }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + 8
    }

    pub fn append_encoded(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.user_key);
        out.extend_from_slice(&tag(self.sequence, self.entry_type).to_le_bytes());
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.append_encoded(&mut out);
        out
    }

    pub fn decode(encoded: &[u8]) -> Result<Self, InvalidInternalKey> {
        let user_key_len = encoded.len().checked_sub(8).ok_or(InvalidInternalKey::TooShort)?;
        let (user_key, packed_tag) = encoded.split_at(user_key_len);
        let packed_tag: [u8; 8] = packed_tag.try_into().expect("split_at(len - 8) yields 8 bytes");
        let packed_tag = u64::from_le_bytes(packed_tag);

        let sequence = SequenceNumber::new_unchecked(packed_tag >> 8);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the low byte of the tag is exactly the entry type"
        )]
        let entry_type = EntryType::try_from(packed_tag as u8)?;

        Ok(Self { user_key: user_key.to_vec(), sequence, entry_type })
    }
}

#[inline]
#[must_use]
fn tag(sequence: SequenceNumber, entry_type: EntryType) -> u64 {
    (sequence.inner() << 8) | u64::from(u8::from(entry_type))
}

#[derive(Debug, Error)]
pub enum InvalidInternalKey {
    #[error("encoded internal key is shorter than the 8-byte tag suffix")]
    TooShort,
    #[error(transparent)]
    BadEntryType(#[from] InvalidEntryType),
}

/// Orders encoded internal keys (as produced by [`InternalKey::encode`]) by user key ascending,
/// then by sequence number descending, so that a forward scan over equal user keys visits the
/// most recent write first.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalKeyComparator;

impl InternalKeyComparator {
    #[must_use]
    pub fn compare_keys(&self, a: &InternalKey, b: &InternalKey) -> Ordering {
        a.user_key
            .cmp(&b.user_key)
            .then_with(|| b.sequence.cmp(&a.sequence))
    }
}

impl seekable_iterator::Comparator<[u8]> for InternalKeyComparator {
    fn cmp(&self, a: &[u8], b: &[u8]) -> Ordering {
        let a_user_key_len = a.len().saturating_sub(8);
        let b_user_key_len = b.len().saturating_sub(8);

        #[expect(clippy::indexing_slicing, reason = "saturating_sub caps the split point at len")]
        let user_key_order = a[..a_user_key_len].cmp(&b[..b_user_key_len]);

        user_key_order.then_with(|| {
            // Tag bytes compared as little-endian u64 descending; since the entry type occupies
            // only the lowest byte, comparing the raw tag bytes in reverse byte order achieves
            // "higher sequence number first" without re-parsing the tag.
            let a_tag = a.get(a_user_key_len..).unwrap_or(&[]);
            let b_tag = b.get(b_user_key_len..).unwrap_or(&[]);
            a_tag.iter().rev().cmp(b_tag.iter().rev()).reverse()
        })
    }
}

impl NonRecursive for InternalKeyComparator {}

impl IndependentClone<NearInstant> for InternalKeyComparator {
    #[inline]
    fn independent_clone(&self) -> Self {
        Self
    }
}

impl MirroredClone<NearInstant> for InternalKeyComparator {
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self
    }
}

/// Orders raw user keys only, ignoring sequence number and entry type.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserKeyComparator;

impl seekable_iterator::Comparator<[u8]> for UserKeyComparator {
    fn cmp(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

impl NonRecursive for UserKeyComparator {}

impl IndependentClone<NearInstant> for UserKeyComparator {
    #[inline]
    fn independent_clone(&self) -> Self {
        Self
    }
}

impl MirroredClone<NearInstant> for UserKeyComparator {
    #[inline]
    fn mirrored_clone(&self) -> Self {
        Self
    }
}
