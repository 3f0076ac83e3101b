use thiserror::Error;

/// A monotonically increasing write sequence number.
///
/// Sequence numbers order writes to the same user key: the entry with the larger
/// [`SequenceNumber`] is the more recent write. Only the bottom 56 bits of the backing `u64`
/// are usable, mirroring the tag layout used to pack a sequence number and an [`EntryType`]
/// (see [`crate::internal_key`]) into a single 8-byte suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub const ZERO: Self = Self(0);
    pub const MAX_USABLE_SEQUENCE_NUMBER: Self = Self((1 << 56) - 2);
    pub const MAX_SEQUENCE_NUMBER: Self = Self((1 << 56) - 1);

    /// Returns `Some(SequenceNumber(sequence_number))` if `sequence_number` is small enough to
    /// be used as a normal, usable sequence number.
    #[inline]
    #[must_use]
    pub const fn new_usable(sequence_number: u64) -> Option<Self> {
        if sequence_number <= Self::MAX_USABLE_SEQUENCE_NUMBER.0 {
            Some(Self(sequence_number))
        } else {
            None
        }
    }

    /// Constructs a `SequenceNumber` without checking that it is usable.
    ///
    /// `sequence_number` must be at most [`Self::MAX_SEQUENCE_NUMBER`] to be a valid encoding,
    /// and at most [`Self::MAX_USABLE_SEQUENCE_NUMBER`] to be usable as an ordinary sequence
    /// number assigned to a write.
    #[inline]
    #[must_use]
    pub const fn new_unchecked(sequence_number: u64) -> Self {
        Self(sequence_number)
    }

    #[inline]
    #[must_use]
    pub const fn inner(self) -> u64 {
        self.0
    }

    /// Returns `SequenceNumber(self.0 + additional)`, checked for overflow past
    /// [`Self::MAX_USABLE_SEQUENCE_NUMBER`].
    #[inline]
    pub fn checked_add(self, additional: u64) -> Result<Self, OutOfSequenceNumbers> {
        let new_sequence_number = self.0.checked_add(additional).ok_or(OutOfSequenceNumbers)?;

        if new_sequence_number <= Self::MAX_USABLE_SEQUENCE_NUMBER.0 {
            Ok(Self(new_sequence_number))
        } else {
            Err(OutOfSequenceNumbers)
        }
    }
}

#[derive(Error, Debug, Clone, Copy)]
#[error("sequence numbers exhausted: a write log has run past 2^56 entries")]
pub struct OutOfSequenceNumbers;
