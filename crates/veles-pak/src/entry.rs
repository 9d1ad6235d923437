//! Directory entry records.

use std::fmt;
use std::sync::Arc;

use veles_common::BinaryReader;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Result;

/// Resolved compression method of an entry.
///
/// The index records store a raw method index; resolution against the
/// footer's name table happens during directory decoding, so downstream
/// code never sees the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored uncompressed.
    Store,
    /// Compressed with a named method from the footer table.
    Named(Arc<str>),
    /// Legacy custom method; the actual compressor must be detected from
    /// the entry's leading bytes.
    Detect,
}

impl CompressionMethod {
    /// Whether the entry data is stored uncompressed.
    #[inline]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store)
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => f.write_str("store"),
            Self::Named(name) => f.write_str(name),
            Self::Detect => f.write_str("detect"),
        }
    }
}

/// Fixed-layout entry record as serialized in the index.
///
/// Used verbatim by the legacy format and by the modern format's
/// decoded-entries array.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct PakEntryRecord {
    /// Absolute offset of the entry data
    pub offset: u64,
    /// Stored (possibly compressed) size in bytes
    pub compressed_size: u64,
    /// Uncompressed size in bytes
    pub uncompressed_size: u64,
    /// Raw compression method index
    pub method_index: u32,
    /// Content hash (not verified)
    pub hash: [u8; 20],
    /// Whether the entry data is encrypted
    pub encrypted: u8,
}

/// Entry metadata before method resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawEntry {
    pub offset: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub method_index: u32,
    pub encrypted: bool,
    pub hash: [u8; 20],
}

impl From<PakEntryRecord> for RawEntry {
    fn from(r: PakEntryRecord) -> Self {
        Self {
            offset: r.offset,
            compressed_size: r.compressed_size,
            uncompressed_size: r.uncompressed_size,
            method_index: r.method_index,
            encrypted: r.encrypted != 0,
            hash: r.hash,
        }
    }
}

/// Decoded entry with its compression method resolved.
#[derive(Debug, Clone)]
pub struct PakEntry {
    /// Absolute offset of the entry data.
    pub offset: u64,
    /// Stored (possibly compressed) size in bytes.
    pub compressed_size: u64,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Resolved compression method.
    pub method: CompressionMethod,
    /// Whether the entry data is encrypted.
    pub encrypted: bool,
    /// Content hash from the index (zeroed for bit-packed entries).
    pub hash: [u8; 20],
}

/// Where a modern directory row finds its entry metadata.
///
/// The on-disk form is a signed location value: negative values index the
/// decoded-entries array, non-negative values are byte offsets into the
/// encoded-entries block. Decoding turns the sign-bit dispatch into this
/// enum so the two cases cannot be confused downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLocation {
    /// Index into the decoded-entries array (shared entry data).
    Decoded(u32),
    /// Byte offset into the encoded-entries block.
    Encoded(u32),
}

impl EntryLocation {
    /// Decode the raw signed location value.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Self::Decoded((-(raw as i64 + 1)) as u32)
        } else {
            Self::Encoded(raw as u32)
        }
    }
}

/// Bit-packed entry flags used by the encoded-entries block.
mod packed {
    pub const OFFSET_32BIT: u32 = 1 << 31;
    pub const SIZE_32BIT: u32 = 1 << 30;
    pub const COMPRESSED_SIZE_32BIT: u32 = 1 << 29;
    pub const METHOD_SHIFT: u32 = 23;
    pub const METHOD_MASK: u32 = 0x3F;
    pub const ENCRYPTED: u32 = 1 << 22;
}

/// Decode one bit-packed entry at the reader's position.
///
/// Layout: a flags word, then offset and uncompressed size (each 32 or 64
/// bits per the flags), then - only for compressed entries - the stored
/// size. Stored entries reuse the uncompressed size.
pub(crate) fn decode_packed_entry(reader: &mut BinaryReader<'_>) -> Result<RawEntry> {
    let flags = reader.read_u32()?;

    let method_index = (flags >> packed::METHOD_SHIFT) & packed::METHOD_MASK;
    let encrypted = flags & packed::ENCRYPTED != 0;

    let offset = if flags & packed::OFFSET_32BIT != 0 {
        u64::from(reader.read_u32()?)
    } else {
        reader.read_u64()?
    };
    let uncompressed_size = if flags & packed::SIZE_32BIT != 0 {
        u64::from(reader.read_u32()?)
    } else {
        reader.read_u64()?
    };
    let compressed_size = if method_index != 0 {
        if flags & packed::COMPRESSED_SIZE_32BIT != 0 {
            u64::from(reader.read_u32()?)
        } else {
            reader.read_u64()?
        }
    } else {
        uncompressed_size
    };

    Ok(RawEntry {
        offset,
        compressed_size,
        uncompressed_size,
        method_index,
        encrypted,
        hash: [0; 20],
    })
}

/// Encode one bit-packed entry. Used by tests and index-building tools.
#[allow(dead_code)]
pub(crate) fn encode_packed_entry(out: &mut Vec<u8>, entry: &RawEntry) {
    let mut flags = 0u32;
    flags |= (entry.method_index & packed::METHOD_MASK) << packed::METHOD_SHIFT;
    if entry.encrypted {
        flags |= packed::ENCRYPTED;
    }
    if entry.offset <= u64::from(u32::MAX) {
        flags |= packed::OFFSET_32BIT;
    }
    if entry.uncompressed_size <= u64::from(u32::MAX) {
        flags |= packed::SIZE_32BIT;
    }
    if entry.compressed_size <= u64::from(u32::MAX) {
        flags |= packed::COMPRESSED_SIZE_32BIT;
    }
    out.extend_from_slice(&flags.to_le_bytes());

    if flags & packed::OFFSET_32BIT != 0 {
        out.extend_from_slice(&(entry.offset as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&entry.offset.to_le_bytes());
    }
    if flags & packed::SIZE_32BIT != 0 {
        out.extend_from_slice(&(entry.uncompressed_size as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
    }
    if entry.method_index != 0 {
        if flags & packed::COMPRESSED_SIZE_32BIT != 0 {
            out.extend_from_slice(&(entry.compressed_size as u32).to_le_bytes());
        } else {
            out.extend_from_slice(&entry.compressed_size.to_le_bytes());
        }
    }
}
