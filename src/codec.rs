//! Binary form of index entries.
//!
//! Record layout, big-endian:
//!
//! | field             | type                 |
//! |-------------------|----------------------|
//! | start offset      | `i64`                |
//! | start line        | `i64`                |
//! | tag buffer length | `u32`                |
//! | tag buffer        | `[u8; length]`       |
//!
//! The tag buffer holds the eight slots in canonical order, each as a `u8`
//! byte count followed by that many UTF-8 bytes.

use crate::error::{Error, Result};
use crate::types::{Entry, MAX_TAG_LEN, TagBuffer, TagType};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::str;

/// Largest tag buffer a valid record can declare.
pub const MAX_TAG_BUFFER_LEN: u32 = (TagType::COUNT * (MAX_TAG_LEN + 1)) as u32;

pub fn encode_tags(tags: &TagBuffer) -> Vec<u8> {
    let mut buf = Vec::with_capacity(TagType::COUNT + 64);
    for (_, value) in tags.iter() {
        let bytes = &value.as_bytes()[..value.len().min(MAX_TAG_LEN)];
        buf.push(bytes.len() as u8);
        buf.extend_from_slice(bytes);
    }
    buf
}

pub fn decode_tags(bytes: &[u8]) -> Result<TagBuffer> {
    let mut tags = TagBuffer::default();
    let mut rest = bytes;

    for tag in TagType::ALL {
        let Some((&len, tail)) = rest.split_first() else {
            return Err(Error::corrupt(format!(
                "tag buffer ends before the {} slot",
                tag.name()
            )));
        };
        let len = usize::from(len);
        if tail.len() < len {
            return Err(Error::corrupt(format!(
                "{} slot declares {len} bytes, {} available",
                tag.name(),
                tail.len()
            )));
        }

        let (value, tail) = tail.split_at(len);
        let value = str::from_utf8(value)
            .map_err(|_| Error::corrupt(format!("{} slot is not valid UTF-8", tag.name())))?;
        tags.set(tag, value);
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after tag buffer",
            rest.len()
        )));
    }
    Ok(tags)
}

pub fn write_entry<W: Write>(out: &mut W, entry: &Entry) -> Result<()> {
    let pos = i64::try_from(entry.pos())
        .map_err(|_| Error::corrupt(format!("offset {} out of range", entry.pos())))?;
    let line_number = i64::try_from(entry.line_number())
        .map_err(|_| Error::corrupt(format!("line {} out of range", entry.line_number())))?;
    let tags = encode_tags(entry.tags());

    out.write_i64::<BigEndian>(pos)?;
    out.write_i64::<BigEndian>(line_number)?;
    out.write_u32::<BigEndian>(tags.len() as u32)?;
    out.write_all(&tags)?;
    Ok(())
}

/// Reads one record. Short input is reported as [`Error::CorruptRecord`];
/// no more than the declared, bounded tag buffer is ever requested.
pub fn read_entry<R: Read>(input: &mut R) -> Result<Entry> {
    let pos = input
        .read_i64::<BigEndian>()
        .map_err(Error::from_record_io)?;
    let line_number = input
        .read_i64::<BigEndian>()
        .map_err(Error::from_record_io)?;
    let len = input
        .read_u32::<BigEndian>()
        .map_err(Error::from_record_io)?;

    let pos = u64::try_from(pos).map_err(|_| Error::corrupt(format!("negative offset {pos}")))?;
    if line_number < 1 {
        return Err(Error::corrupt(format!("invalid line number {line_number}")));
    }
    if len > MAX_TAG_BUFFER_LEN {
        return Err(Error::corrupt(format!(
            "tag buffer length {len} exceeds {MAX_TAG_BUFFER_LEN}"
        )));
    }

    let mut tags = vec![0u8; len as usize];
    input.read_exact(&mut tags).map_err(Error::from_record_io)?;

    Ok(Entry {
        tags: decode_tags(&tags)?,
        pos,
        line_number: line_number as u64,
    })
}

impl Entry {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(24 + TagType::COUNT + 64);
        write_entry(&mut buf, self)?;
        Ok(buf)
    }

    /// Decodes exactly one record; trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rest = bytes;
        let entry = read_entry(&mut rest)?;
        if !rest.is_empty() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after record",
                rest.len()
            )));
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::PgnStream;

    fn sample() -> Entry {
        Entry::new()
            .with_tag(TagType::Event, "Wch")
            .with_tag(TagType::Date, "1985.11.09")
            .with_tag(TagType::White, "Kasparov, Garry")
            .with_tag(TagType::Black, "Karpov, Anatoly")
            .with_tag(TagType::Result, "1-0")
            .with_position(4096, 120)
    }

    #[test]
    fn test_round_trip_hand_built_entries() {
        let long_name = "Ä".repeat(300);
        for entry in [
            Entry::new(),
            sample(),
            Entry::new().with_tag(TagType::Variant, "crazyhouse"),
            Entry::new().with_tag(TagType::Site, &long_name),
        ] {
            let bytes = entry.to_bytes().unwrap();
            assert_eq!(Entry::from_bytes(&bytes).unwrap(), entry);
        }
    }

    #[test]
    fn test_round_trip_parsed_entries() {
        let pgn = "[Event \"Rapid\"]\n[Site \"Zürich\"]\n[Round \"7\"]\n\n1. c4 *\n\n\
                   [White \"Ding\"]\n[Black \"Nepo\"]\n\n1. d4 1/2-1/2\n";
        let mut stream = PgnStream::new(pgn.as_bytes());
        let mut bytes = Vec::new();
        let mut parsed = Vec::new();
        while let Some(entry) = Entry::from_pgn(&mut stream).unwrap() {
            write_entry(&mut bytes, &entry).unwrap();
            parsed.push(entry);
        }
        assert_eq!(parsed.len(), 2);

        let mut input = bytes.as_slice();
        for expected in &parsed {
            assert_eq!(&read_entry(&mut input).unwrap(), expected);
        }
        assert!(input.is_empty());
    }

    #[test]
    fn test_record_layout() {
        let entry = Entry::new()
            .with_tag(TagType::Event, "E")
            .with_position(1, 2);
        let bytes = entry.to_bytes().unwrap();

        assert_eq!(&bytes[0..8], &1i64.to_be_bytes());
        assert_eq!(&bytes[8..16], &2i64.to_be_bytes());
        assert_eq!(&bytes[16..20], &9u32.to_be_bytes());
        assert_eq!(&bytes[20..], &[1, b'E', 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_length_prefix_past_end_is_corrupt() {
        let mut bytes = sample().to_bytes().unwrap();
        let declared = (bytes.len() - 20 + 10) as u32;
        bytes[16..20].copy_from_slice(&declared.to_be_bytes());

        assert!(matches!(
            Entry::from_bytes(&bytes),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        let mut bytes = Entry::new().to_bytes().unwrap();
        bytes[16..20].copy_from_slice(&u32::MAX.to_be_bytes());

        let err = Entry::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_truncated_records_are_corrupt() {
        let bytes = sample().to_bytes().unwrap();
        for cut in [0, 7, 16, 19, 21, bytes.len() - 1] {
            assert!(
                matches!(Entry::from_bytes(&bytes[..cut]), Err(Error::CorruptRecord(_))),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_inconsistent_tag_buffers_are_corrupt() {
        assert!(decode_tags(&[0, 0, 0]).is_err());
        assert!(decode_tags(&[0; 9]).is_err());
        assert!(decode_tags(&[5, b'a', 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(decode_tags(&[2, 0xff, 0xfe, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(decode_tags(&[0; 8]).unwrap().is_empty());
    }

    #[test]
    fn test_negative_offset_and_zero_line_are_corrupt() {
        let mut bytes = Entry::new().to_bytes().unwrap();
        bytes[0..8].copy_from_slice(&(-1i64).to_be_bytes());
        assert!(Entry::from_bytes(&bytes).is_err());

        let mut bytes = Entry::new().to_bytes().unwrap();
        bytes[8..16].copy_from_slice(&0i64.to_be_bytes());
        assert!(Entry::from_bytes(&bytes).is_err());
    }
}
