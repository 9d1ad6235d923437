//! Container directory index decoding.
//!
//! The index block is read into memory once (decrypted if the footer says
//! so), then decoded along one of two paths:
//!
//! - **Legacy**: a linear list of name + fixed-layout record pairs.
//! - **Modern/hashed**: encoded and decoded entry pools referenced by a
//!   full directory index stored in a separate region of the file. Only
//!   the full directory index is supported; archives shipping nothing but
//!   the path-hash sub-index are excluded.

use tracing::debug;
use veles_common::BinaryReader;

use crate::entry::{decode_packed_entry, RawEntry};
use crate::{
    crypto, AesKey, EntryLocation, Error, KeyRing, PakEntry, PakEntryRecord, PakFooter, Result,
};

/// One decoded directory row: normalized directory path, bare file name,
/// and the entry's resolved metadata.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Mount-point-prefixed directory path, no trailing slash.
    pub directory: String,
    /// Bare leaf file name.
    pub filename: String,
    /// Resolved entry metadata.
    pub entry: PakEntry,
}

/// A fully decoded directory index.
#[derive(Debug, Clone)]
pub struct PakIndex {
    /// Normalized mount point.
    pub mount_point: String,
    /// File count declared by the index header.
    pub declared_count: u32,
    /// Decoded entries in directory traversal order.
    pub entries: Vec<IndexEntry>,
    /// Index of the key that decrypted the block, if any.
    pub key_index: Option<usize>,
}

/// Decode an archive's directory index.
///
/// `data` is the whole archive; the modern format re-seeks into it for the
/// full directory region.
pub(crate) fn decode_index(data: &[u8], footer: &PakFooter, keys: &KeyRing) -> Result<PakIndex> {
    let start = footer.index_offset as usize;
    let end = start + footer.index_size as usize;
    let mut block = data[start..end].to_vec();

    let mut key_index = None;
    if footer.encrypted_index {
        let idx = crypto::recover_key(&block, keys.keys()).ok_or(Error::KeyNotFound)?;
        key_index = Some(idx);
        // Only the validated key's decryption replaces the block.
        decrypt_block(&mut block, &keys.keys()[idx])?;
    }

    let mut reader = BinaryReader::new(&block);
    let mount_point = normalize_mount_point(&reader.read_indexed_string()?);
    let declared_count = reader.read_u32()?;

    if declared_count == 0 {
        debug!(%mount_point, "empty archive");
        return Ok(PakIndex {
            mount_point,
            declared_count,
            entries: Vec::new(),
            key_index,
        });
    }

    let entries = if footer.is_hashed_index() {
        decode_hashed(
            data,
            footer,
            keys,
            key_index,
            &mut reader,
            &mount_point,
            declared_count,
        )?
    } else {
        decode_legacy(footer, &mut reader, &mount_point, declared_count)?
    };

    Ok(PakIndex {
        mount_point,
        declared_count,
        entries,
        key_index,
    })
}

fn decode_legacy(
    footer: &PakFooter,
    reader: &mut BinaryReader<'_>,
    mount_point: &str,
    count: u32,
) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = reader.read_indexed_string()?;
        let record: PakEntryRecord = reader.read_struct()?;

        let combined = join_path(mount_point, &name);
        let (directory, filename) = split_path(&combined);
        entries.push(IndexEntry {
            directory: directory.to_string(),
            filename: filename.to_string(),
            entry: resolve_entry(footer, RawEntry::from(record))?,
        });
    }
    Ok(entries)
}

#[allow(clippy::too_many_arguments)]
fn decode_hashed(
    data: &[u8],
    footer: &PakFooter,
    keys: &KeyRing,
    key_index: Option<usize>,
    reader: &mut BinaryReader<'_>,
    mount_point: &str,
    declared_count: u32,
) -> Result<Vec<IndexEntry>> {
    // Consumed but unused: point lookup through the hash is not supported,
    // the directory is always traversed linearly.
    let _path_hash_seed = reader.read_u64()?;

    // Optional path-hash sub-index descriptor: skipped, hash unverified.
    if reader.read_bool()? {
        let _offset = reader.read_u64()?;
        let _size = reader.read_u64()?;
        reader.advance(20);
    }

    let full_directory = if reader.read_bool()? {
        let offset = reader.read_u64()?;
        let size = reader.read_u64()?;
        reader.advance(20);
        Some((offset, size))
    } else {
        None
    };
    let (full_offset, full_size) = full_directory.ok_or(Error::MissingFullIndex)?;

    // Shared entry pools: a bit-packed byte block and a decoded array.
    let encoded_len = reader.read_u32()? as usize;
    let encoded = reader.read_bytes(encoded_len)?;

    let decoded_count = reader.read_u32()? as usize;
    let mut decoded = Vec::with_capacity(decoded_count);
    for _ in 0..decoded_count {
        let record: PakEntryRecord = reader.read_struct()?;
        decoded.push(RawEntry::from(record));
    }

    // The full directory index lives in its own region of the file and is
    // decrypted independently.
    let start = full_offset as usize;
    let end = start
        .checked_add(full_size as usize)
        .filter(|&e| e <= data.len())
        .ok_or_else(|| Error::InvalidIndex("full directory index out of bounds".into()))?;
    let mut dir_block = data[start..end].to_vec();
    if footer.encrypted_index {
        let idx = key_index.ok_or(Error::KeyNotFound)?;
        decrypt_block(&mut dir_block, &keys.keys()[idx])?;
    }

    let mut dir_reader = BinaryReader::new(&dir_block);
    let directory_count = dir_reader.read_u32()?;

    let mut entries = Vec::with_capacity(declared_count as usize);
    for _ in 0..directory_count {
        let dir_name = dir_reader.read_indexed_string()?;
        let directory = directory_path(mount_point, &dir_name);

        let files_in_directory = dir_reader.read_u32()?;
        for _ in 0..files_in_directory {
            let filename = dir_reader.read_indexed_string()?;
            let raw = match EntryLocation::from_raw(dir_reader.read_i32()?) {
                EntryLocation::Decoded(i) => *decoded.get(i as usize).ok_or_else(|| {
                    Error::InvalidIndex(format!("decoded entry index {i} out of range"))
                })?,
                EntryLocation::Encoded(offset) => {
                    if offset as usize >= encoded.len() {
                        return Err(Error::InvalidIndex(format!(
                            "encoded entry offset {offset} out of range"
                        )));
                    }
                    let mut entry_reader = BinaryReader::new(&encoded[offset as usize..]);
                    decode_packed_entry(&mut entry_reader)?
                }
            };
            entries.push(IndexEntry {
                directory: directory.clone(),
                filename,
                entry: resolve_entry(footer, raw)?,
            });
        }
    }

    // The traversed directory must account for every declared file; a
    // disagreement means none of this archive's entries can be trusted.
    if entries.len() != declared_count as usize {
        return Err(Error::CountMismatch {
            declared: declared_count,
            decoded: entries.len() as u32,
        });
    }

    Ok(entries)
}

fn resolve_entry(footer: &PakFooter, raw: RawEntry) -> Result<PakEntry> {
    Ok(PakEntry {
        offset: raw.offset,
        compressed_size: raw.compressed_size,
        size: raw.uncompressed_size,
        method: footer.resolve_method(raw.method_index)?,
        encrypted: raw.encrypted,
        hash: raw.hash,
    })
}

fn decrypt_block(block: &mut [u8], key: &AesKey) -> Result<()> {
    crypto::decrypt_in_place(block, key).map_err(|e| Error::Decryption(e.to_string()))
}

/// Strip relative-path and root prefixes from the stored mount point.
fn normalize_mount_point(raw: &str) -> String {
    let mut s = raw;
    while let Some(rest) = s.strip_prefix("../") {
        s = rest;
    }
    s.trim_start_matches('/').to_string()
}

/// Join a mount point and a relative name with exactly one separating slash.
fn join_path(prefix: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

/// Build a directory's absolute path, stripping the trailing slash except
/// when the result would be empty.
fn directory_path(mount_point: &str, dir_name: &str) -> String {
    let mut path = join_path(mount_point, dir_name);
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

fn split_path(combined: &str) -> (&str, &str) {
    match combined.rfind('/') {
        Some(i) => (&combined[..i], &combined[i + 1..]),
        None => ("", combined),
    }
}

/// Synthetic archive builders shared by this crate's tests.
#[cfg(test)]
pub(crate) mod build {
    use super::*;
    use crate::entry::encode_packed_entry;

    pub(crate) struct FileSpec {
        pub name: &'static str,
        pub data: Vec<u8>,
        pub size: u64,
        pub csize: u64,
        pub method_index: u32,
        pub encrypted: bool,
        /// Modern format: store through the decoded array instead of the
        /// encoded block.
        pub shared: bool,
    }

    impl FileSpec {
        /// An uncompressed, unencrypted file.
        pub(crate) fn stored(name: &'static str, data: &[u8]) -> Self {
            Self {
                name,
                data: data.to_vec(),
                size: data.len() as u64,
                csize: data.len() as u64,
                method_index: 0,
                encrypted: false,
                shared: false,
            }
        }
    }

    pub(crate) fn ser_string(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }

    fn ser_record(out: &mut Vec<u8>, raw: &RawEntry) {
        out.extend_from_slice(&raw.offset.to_le_bytes());
        out.extend_from_slice(&raw.compressed_size.to_le_bytes());
        out.extend_from_slice(&raw.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&raw.method_index.to_le_bytes());
        out.extend_from_slice(&raw.hash);
        out.push(raw.encrypted as u8);
    }

    pub(crate) fn write_footer(
        out: &mut Vec<u8>,
        encrypted: bool,
        version: u32,
        index_offset: u64,
        index_size: u64,
        methods: &[&str],
    ) {
        out.push(encrypted as u8);
        out.extend_from_slice(&PakFooter::MAGIC.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&index_offset.to_le_bytes());
        out.extend_from_slice(&index_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);
        if version >= PakFooter::VERSION_NAMED_METHODS {
            for i in 0..PakFooter::METHOD_SLOTS {
                let mut slot = [0u8; PakFooter::METHOD_NAME_LEN];
                if let Some(name) = methods.get(i) {
                    slot[..name.len()].copy_from_slice(name.as_bytes());
                }
                out.extend_from_slice(&slot);
            }
        }
    }

    fn pad_to_block(buf: &mut Vec<u8>) {
        while buf.len() % crypto::BLOCK_LEN != 0 {
            buf.push(0);
        }
    }

    fn seal(
        mut out: Vec<u8>,
        mut index: Vec<u8>,
        version: u32,
        methods: &[&str],
        key: Option<&AesKey>,
    ) -> Vec<u8> {
        if let Some(key) = key {
            pad_to_block(&mut index);
            crate::crypto::tests::encrypt_in_place(&mut index, key);
        }
        let index_offset = out.len() as u64;
        let index_size = index.len() as u64;
        out.extend_from_slice(&index);
        write_footer(&mut out, key.is_some(), version, index_offset, index_size, methods);
        out
    }

    fn raw_for(offset: u64, f: &FileSpec) -> RawEntry {
        RawEntry {
            offset,
            compressed_size: f.csize,
            uncompressed_size: f.size,
            method_index: f.method_index,
            encrypted: f.encrypted,
            hash: [0; 20],
        }
    }

    /// Build a legacy-format archive around the given files.
    pub(crate) fn legacy_pak(
        mount: &str,
        version: u32,
        methods: &[&str],
        files: &[FileSpec],
        key: Option<&AesKey>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::new();
        for f in files {
            offsets.push(out.len() as u64);
            out.extend_from_slice(&f.data);
        }

        let mut index = Vec::new();
        ser_string(&mut index, mount);
        index.extend_from_slice(&(files.len() as u32).to_le_bytes());
        for (offset, f) in offsets.iter().zip(files) {
            ser_string(&mut index, f.name);
            ser_record(&mut index, &raw_for(*offset, f));
        }
        seal(out, index, version, methods, key)
    }

    /// Build a modern-format archive: directory map + entry pools + full
    /// directory region. `declared_override` forges the declared file count.
    pub(crate) fn hashed_pak(
        mount: &str,
        version: u32,
        methods: &[&str],
        dirs: &[(&str, Vec<FileSpec>)],
        key: Option<&AesKey>,
        declared_override: Option<u32>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut encoded = Vec::new();
        let mut decoded: Vec<RawEntry> = Vec::new();

        let mut dir_block = Vec::new();
        dir_block.extend_from_slice(&(dirs.len() as u32).to_le_bytes());
        let mut total = 0u32;
        for (dir_name, files) in dirs {
            ser_string(&mut dir_block, dir_name);
            dir_block.extend_from_slice(&(files.len() as u32).to_le_bytes());
            for f in files {
                total += 1;
                let offset = out.len() as u64;
                out.extend_from_slice(&f.data);
                let raw = raw_for(offset, f);

                ser_string(&mut dir_block, f.name);
                let location: i32 = if f.shared {
                    decoded.push(raw);
                    -(decoded.len() as i32)
                } else {
                    let at = encoded.len() as i32;
                    encode_packed_entry(&mut encoded, &raw);
                    at
                };
                dir_block.extend_from_slice(&location.to_le_bytes());
            }
        }

        if let Some(k) = key {
            pad_to_block(&mut dir_block);
            crate::crypto::tests::encrypt_in_place(&mut dir_block, k);
        }
        let full_offset = out.len() as u64;
        let full_size = dir_block.len() as u64;
        out.extend_from_slice(&dir_block);

        let mut index = Vec::new();
        ser_string(&mut index, mount);
        index.extend_from_slice(&declared_override.unwrap_or(total).to_le_bytes());
        index.extend_from_slice(&0x1234_5678_9ABC_DEF0u64.to_le_bytes()); // path hash seed
        index.push(1); // path-hash sub-index present, skipped by the reader
        index.extend_from_slice(&0u64.to_le_bytes());
        index.extend_from_slice(&0u64.to_le_bytes());
        index.extend_from_slice(&[0u8; 20]);
        index.push(1); // full directory index
        index.extend_from_slice(&full_offset.to_le_bytes());
        index.extend_from_slice(&full_size.to_le_bytes());
        index.extend_from_slice(&[0u8; 20]);
        index.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        index.extend_from_slice(&encoded);
        index.extend_from_slice(&(decoded.len() as u32).to_le_bytes());
        for raw in &decoded {
            ser_record(&mut index, raw);
        }
        seal(out, index, version, methods, key)
    }
}
