use integer_encoding::{VarInt as _, VarIntWriter as _};
use nova_format::{read_length_prefixed, write_length_prefixed, InternalKey, LengthPrefixedError, SequenceNumber};
use thiserror::Error;

use crate::file_meta::{FileMetaData, Level};

/// A delta between two `Version`s, logged to the manifest.
///
/// `log_number`/`prev_log_number` carry recovery state: knowing which WAL records are
/// already reflected in on-disk tables after a migration or restart.
#[derive(Debug, Default)]
pub struct VersionEdit {
    pub log_number:       Option<u64>,
    pub prev_log_number:  Option<u64>,
    pub next_file_number: Option<u64>,
    pub last_sequence:    Option<SequenceNumber>,
    pub compact_pointers: Vec<(Level, InternalKey)>,
    pub deleted_files:    Vec<(Level, u64)>,
    pub new_files:        Vec<(Level, FileMetaData)>,
}

impl VersionEdit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, level: Level, file: FileMetaData) {
        self.new_files.push((level, file));
    }

    pub fn delete_file(&mut self, level: Level, file_number: u64) {
        self.deleted_files.push((level, file_number));
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(log_number) = self.log_number {
            write_tag(&mut out, Tag::LogNumber);
            write_varint_u64(&mut out, log_number);
        }
        if let Some(prev_log_number) = self.prev_log_number {
            write_tag(&mut out, Tag::PrevLogNumber);
            write_varint_u64(&mut out, prev_log_number);
        }
        if let Some(next_file_number) = self.next_file_number {
            write_tag(&mut out, Tag::NextFileNumber);
            write_varint_u64(&mut out, next_file_number);
        }
        if let Some(last_sequence) = self.last_sequence {
            write_tag(&mut out, Tag::LastSequence);
            write_varint_u64(&mut out, last_sequence.inner());
        }
        for (level, key) in &self.compact_pointers {
            write_tag(&mut out, Tag::CompactPointer);
            out.push(level.as_usize() as u8);
            write_length_prefixed(&mut out, &key.encode());
        }
        for (level, file_number) in &self.deleted_files {
            write_tag(&mut out, Tag::DeletedFile);
            out.push(level.as_usize() as u8);
            write_varint_u64(&mut out, *file_number);
        }
        for (level, file) in &self.new_files {
            write_tag(&mut out, Tag::NewFile);
            out.push(level.as_usize() as u8);
            write_varint_u64(&mut out, file.file_number());
            write_varint_u64(&mut out, file.file_size());
            write_length_prefixed(&mut out, &file.smallest().encode());
            write_length_prefixed(&mut out, &file.largest().encode());
        }

        out
    }

    pub fn decode(mut input: &[u8]) -> Result<Self, VersionEditDecodeError> {
        let mut edit = Self::new();

        while !input.is_empty() {
            let tag = read_tag(&mut input)?;
            match tag {
                Tag::LogNumber       => edit.log_number       = Some(read_varint_u64(&mut input)?),
                Tag::PrevLogNumber   => edit.prev_log_number  = Some(read_varint_u64(&mut input)?),
                Tag::NextFileNumber  => edit.next_file_number = Some(read_varint_u64(&mut input)?),
                Tag::LastSequence    => {
                    let raw = read_varint_u64(&mut input)?;
                    edit.last_sequence = Some(
                        SequenceNumber::new_usable(raw).ok_or(VersionEditDecodeError::BadSequenceNumber)?,
                    );
                }
                Tag::CompactPointer => {
                    let level = read_level(&mut input)?;
                    let key = read_internal_key(&mut input)?;
                    edit.compact_pointers.push((level, key));
                }
                Tag::DeletedFile => {
                    let level = read_level(&mut input)?;
                    let file_number = read_varint_u64(&mut input)?;
                    edit.deleted_files.push((level, file_number));
                }
                Tag::NewFile => {
                    let level = read_level(&mut input)?;
                    let file_number = read_varint_u64(&mut input)?;
                    let file_size = read_varint_u64(&mut input)?;
                    let smallest = read_internal_key(&mut input)?;
                    let largest = read_internal_key(&mut input)?;
                    edit.new_files.push((level, FileMetaData::new(file_number, file_size, smallest, largest)));
                }
            }
        }

        Ok(edit)
    }
}

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Tag {
    LogNumber       = 1,
    PrevLogNumber   = 2,
    NextFileNumber  = 3,
    LastSequence    = 4,
    CompactPointer  = 5,
    DeletedFile     = 6,
    NewFile         = 7,
}

impl TryFrom<u8> for Tag {
    type Error = VersionEditDecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(Self::LogNumber),
            2 => Ok(Self::PrevLogNumber),
            3 => Ok(Self::NextFileNumber),
            4 => Ok(Self::LastSequence),
            5 => Ok(Self::CompactPointer),
            6 => Ok(Self::DeletedFile),
            7 => Ok(Self::NewFile),
            other => Err(VersionEditDecodeError::BadTag(other)),
        }
    }
}

fn write_tag(out: &mut Vec<u8>, tag: Tag) {
    out.push(tag as u8);
}

fn read_tag(input: &mut &[u8]) -> Result<Tag, VersionEditDecodeError> {
    let (&byte, rest) = input.split_first().ok_or(VersionEditDecodeError::Truncated)?;
    *input = rest;
    Tag::try_from(byte)
}

fn write_varint_u64(out: &mut Vec<u8>, value: u64) {
    out.write_varint(value).expect("writing to a Vec<u8> cannot fail");
}

fn read_varint_u64(input: &mut &[u8]) -> Result<u64, VersionEditDecodeError> {
    if input.is_empty() {
        return Err(VersionEditDecodeError::Truncated);
    }
    let (value, len) = u64::decode_var(input).ok_or(VersionEditDecodeError::BadVarint)?;
    *input = &input[len..];
    Ok(value)
}

fn read_level(input: &mut &[u8]) -> Result<Level, VersionEditDecodeError> {
    let (&byte, rest) = input.split_first().ok_or(VersionEditDecodeError::Truncated)?;
    *input = rest;
    Level::new(byte as usize).ok_or(VersionEditDecodeError::BadLevel(byte))
}

fn read_internal_key(input: &mut &[u8]) -> Result<InternalKey, VersionEditDecodeError> {
    let (bytes, consumed) = read_length_prefixed(input)?;
    let key = InternalKey::decode(bytes).map_err(|_| VersionEditDecodeError::BadInternalKey)?;
    *input = &input[consumed..];
    Ok(key)
}

#[derive(Debug, Error)]
pub enum VersionEditDecodeError {
    #[error("version edit record is truncated")]
    Truncated,
    #[error("version edit record has an unrecognized tag byte {0}")]
    BadTag(u8),
    #[error("version edit record has an out-of-range level {0}")]
    BadLevel(u8),
    #[error("version edit record has a malformed varint")]
    BadVarint,
    #[error("version edit record has a sequence number that is out of the usable range")]
    BadSequenceNumber,
    #[error("version edit record has a malformed internal key")]
    BadInternalKey,
    #[error(transparent)]
    LengthPrefixed(#[from] LengthPrefixedError),
}

#[cfg(test)]
mod tests {
    use nova_format::EntryType;

    use super::*;

    fn key(user_key: &str, seq: u64) -> InternalKey {
        InternalKey::new(user_key.as_bytes(), SequenceNumber::new_usable(seq).unwrap(), EntryType::Value)
    }

    #[test]
    fn round_trips_every_field() {
        let mut edit = VersionEdit::new();
        edit.log_number = Some(4);
        edit.prev_log_number = Some(3);
        edit.next_file_number = Some(10);
        edit.last_sequence = Some(SequenceNumber::new_usable(99).unwrap());
        edit.compact_pointers.push((Level::ZERO, key("p", 5)));
        edit.delete_file(Level::new(1).unwrap(), 2);
        edit.add_file(Level::ZERO, FileMetaData::new(7, 100, key("a", 1), key("z", 1)));

        let encoded = edit.encode();
        let decoded = VersionEdit::decode(&encoded).unwrap();

        assert_eq!(decoded.log_number, Some(4));
        assert_eq!(decoded.prev_log_number, Some(3));
        assert_eq!(decoded.next_file_number, Some(10));
        assert_eq!(decoded.last_sequence, Some(SequenceNumber::new_usable(99).unwrap()));
        assert_eq!(decoded.compact_pointers.len(), 1);
        assert_eq!(decoded.deleted_files, vec![(Level::new(1).unwrap(), 2)]);
        assert_eq!(decoded.new_files.len(), 1);
        assert_eq!(decoded.new_files[0].1.file_number(), 7);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        assert!(matches!(VersionEdit::decode(&[99]), Err(VersionEditDecodeError::BadTag(99))));
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert!(matches!(VersionEdit::decode(&[Tag::LogNumber as u8]), Err(VersionEditDecodeError::Truncated)));
    }
}
