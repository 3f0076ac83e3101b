use nova_format::{read_length_prefixed, write_length_prefixed, EntryType, InternalKey, SequenceNumber};

use crate::error::{Error, Result};

/// Serializes `entries` (ascending internal-key order) into an SSTable's on-the-wire body:
/// length-prefixed encoded key followed by length-prefixed value, repeated.
#[must_use]
pub fn encode_entries(entries: &[(InternalKey, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in entries {
        write_length_prefixed(&mut out, &key.encode());
        write_length_prefixed(&mut out, value);
    }
    out
}

/// Inverse of [`encode_entries`].
///
/// # Errors
/// `Corruption` if the framing is truncated or an encoded internal key fails to decode.
pub fn decode_entries(bytes: &[u8]) -> Result<Vec<(InternalKey, Vec<u8>)>> {
    let mut out = Vec::new();
    let mut remaining = bytes;
    while !remaining.is_empty() {
        let (key_bytes, consumed) = read_length_prefixed(remaining).map_err(|err| Error::Corruption(err.to_string()))?;
        let key = InternalKey::decode(key_bytes).map_err(|err| Error::Corruption(err.to_string()))?;
        remaining = &remaining[consumed..];

        let (value_bytes, consumed) = read_length_prefixed(remaining).map_err(|err| Error::Corruption(err.to_string()))?;
        remaining = &remaining[consumed..];

        out.push((key, value_bytes.to_vec()));
    }
    Ok(out)
}

pub enum Lookup {
    Found(Vec<u8>),
    Tombstone,
    Absent,
}

/// Linear-scans an SSTable's bytes (ascending internal-key order, per [`encode_entries`]) for
/// the newest entry at or below `sequence`.
///
/// # Errors
/// `Corruption` if the framing is truncated or an encoded internal key fails to decode.
pub fn lookup_entry(bytes: &[u8], user_key: &[u8], sequence: SequenceNumber) -> Result<Lookup> {
    let mut remaining = bytes;
    while !remaining.is_empty() {
        let (key_bytes, consumed) = read_length_prefixed(remaining).map_err(|err| Error::Corruption(err.to_string()))?;
        let key = InternalKey::decode(key_bytes).map_err(|err| Error::Corruption(err.to_string()))?;
        remaining = &remaining[consumed..];

        let (value_bytes, consumed) = read_length_prefixed(remaining).map_err(|err| Error::Corruption(err.to_string()))?;
        remaining = &remaining[consumed..];

        if key.user_key.as_slice() > user_key {
            break;
        }
        if key.user_key == user_key && key.sequence <= sequence {
            return Ok(match key.entry_type {
                EntryType::Value => Lookup::Found(value_bytes.to_vec()),
                EntryType::Deletion => Lookup::Tombstone,
            });
        }
    }
    Ok(Lookup::Absent)
}
