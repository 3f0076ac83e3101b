use integer_encoding::{VarInt as _, VarIntWriter as _};
use thiserror::Error;

/// Appends `data` to `out` as a varint32 length prefix followed by the bytes themselves.
///
/// Used for the manifest's `VersionEdit` records and the write-ahead log's entries, so that a
/// reader can walk a buffer of concatenated records without needing fixed-width framing.
pub fn write_length_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.write_varint(u32::try_from(data.len()).expect("record length fits in u32"))
        .expect("writing to a Vec<u8> cannot fail");
    out.extend_from_slice(data);
}

/// Parses one length-prefixed record from the start of `src`, returning the record's bytes and
/// the number of bytes of `src` consumed (prefix + data).
pub fn read_length_prefixed(src: &[u8]) -> Result<(&[u8], usize), LengthPrefixedError> {
    let (data_len, prefix_len) = u32::decode_var(src).ok_or(LengthPrefixedError::BadVarint)?;
    let data_len = usize::try_from(data_len).map_err(|_| LengthPrefixedError::BadVarint)?;
    let end = prefix_len.checked_add(data_len).ok_or(LengthPrefixedError::BadVarint)?;

    if end > src.len() {
        return Err(LengthPrefixedError::Truncated { wanted: end, available: src.len() });
    }

    #[expect(clippy::indexing_slicing, reason = "end <= src.len() checked above")]
    Ok((&src[prefix_len..end], end))
}

#[derive(Debug, Error, Clone, Copy)]
pub enum LengthPrefixedError {
    #[error("length-prefixed record has an invalid varint32 length prefix")]
    BadVarint,
    #[error("length-prefixed record wants {wanted} bytes but only {available} are available")]
    Truncated { wanted: usize, available: usize },
}
