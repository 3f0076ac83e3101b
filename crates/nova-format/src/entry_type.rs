/// Whether an internal-key entry records a value or a tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EntryType {
    Deletion = 0,
    Value    = 1,
}

impl EntryType {
    pub const MIN_TYPE: Self = Self::Deletion;
    pub const MAX_TYPE: Self = Self::Value;
}

impl From<EntryType> for u8 {
    #[inline]
    fn from(entry_type: EntryType) -> Self {
        entry_type as u8
    }
}

impl TryFrom<u8> for EntryType {
    type Error = InvalidEntryType;

    #[inline]
    fn try_from(entry_type: u8) -> Result<Self, Self::Error> {
        match entry_type {
            0 => Ok(Self::Deletion),
            1 => Ok(Self::Value),
            other => Err(InvalidEntryType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("invalid entry type tag: {0}")]
pub struct InvalidEntryType(pub u8);
