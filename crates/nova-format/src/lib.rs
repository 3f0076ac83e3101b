//! Internal-key encoding, the internal-key comparator, and length-prefixed record framing
//! shared by every other crate in the workspace.

mod entry_type;
mod internal_key;
mod length_prefixed;
mod sequence;

pub use entry_type::{EntryType, InvalidEntryType};
pub use internal_key::{InternalKey, InternalKeyComparator, InvalidInternalKey, UserKeyComparator};
pub use length_prefixed::{read_length_prefixed, write_length_prefixed, LengthPrefixedError};
pub use sequence::{OutOfSequenceNumbers, SequenceNumber};
