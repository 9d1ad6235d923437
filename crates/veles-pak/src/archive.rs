//! Archive handle: an opened container with its decoded directory.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::index::{decode_index, IndexEntry, PakIndex};
use crate::{crypto, decompress, AesKey, Error, KeyRing, PakEntry, PakFooter, Result};

/// An opened container archive.
///
/// Owns the memory-mapped file, the parsed footer, and the decoded
/// directory. The key that decrypted the index (if any) is retained so
/// encrypted entries can be read later.
pub struct PakArchive {
    mmap: Mmap,
    name: String,
    path: PathBuf,
    footer: PakFooter,
    index: PakIndex,
    key: Option<AesKey>,
}

impl PakArchive {
    /// Open an archive and decode its directory index.
    ///
    /// Fails with [`Error::KeyNotFound`] when the index is encrypted and no
    /// candidate key validates, with [`Error::MissingFullIndex`] for
    /// hash-only archives, and with [`Error::CountMismatch`] when the
    /// decoded directory disagrees with the declared file count.
    pub fn open<P: AsRef<Path>>(path: P, keys: &KeyRing) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let footer = PakFooter::find(&mmap)?;
        let index = decode_index(&mmap, &footer, keys)?;
        let key = index.key_index.map(|i| keys.keys()[i].clone());

        Ok(Self {
            mmap,
            name,
            path: path.to_path_buf(),
            footer,
            index,
            key,
        })
    }

    /// Get the archive's file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the path the archive was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the container format version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.footer.version
    }

    /// Get the normalized mount point.
    #[inline]
    pub fn mount_point(&self) -> &str {
        &self.index.mount_point
    }

    /// Index of the candidate key that decrypted the directory, if any.
    #[inline]
    pub fn key_index(&self) -> Option<usize> {
        self.index.key_index
    }

    /// Get the number of decoded entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.index.entries.len()
    }

    /// Decoded entries in directory traversal order.
    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.index.entries
    }

    /// Get an entry by in-archive index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&IndexEntry> {
        self.index.entries.get(index)
    }

    /// Read an entry's uncompressed bytes by in-archive index.
    pub fn read_index(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .get(index)
            .ok_or_else(|| Error::InvalidIndex(format!("entry index {index} out of bounds")))?;
        self.read(&entry.entry)
    }

    /// Read an entry's bytes, handling decryption and decompression.
    pub fn read(&self, entry: &PakEntry) -> Result<Vec<u8>> {
        if entry.size == 0 {
            return Ok(Vec::new());
        }

        // Encrypted entry data is stored padded to the cipher block size.
        let stored_len = if entry.encrypted {
            entry.compressed_size.div_ceil(crypto::BLOCK_LEN as u64) * crypto::BLOCK_LEN as u64
        } else {
            entry.compressed_size
        };

        let start = entry.offset as usize;
        let end = start
            .checked_add(stored_len as usize)
            .filter(|&e| e <= self.mmap.len())
            .ok_or_else(|| {
                Error::InvalidIndex(format!(
                    "entry data [{}..{}] exceeds archive size {}",
                    entry.offset,
                    entry.offset.saturating_add(stored_len),
                    self.mmap.len()
                ))
            })?;

        let stored = &self.mmap[start..end];
        let compressed = if entry.encrypted {
            let key = self.key.as_ref().ok_or_else(|| {
                Error::Decryption("entry is encrypted but no key was recovered".into())
            })?;
            let mut buf = stored.to_vec();
            crypto::decrypt_in_place(&mut buf, key).map_err(|e| Error::Decryption(e.to_string()))?;
            buf.truncate(entry.compressed_size as usize);
            buf
        } else {
            stored.to_vec()
        };

        let output = decompress::decompress(&entry.method, &compressed, entry.size as usize)?;
        if output.len() != entry.size as usize {
            return Err(Error::Decompression(format!(
                "entry size mismatch: expected {}, got {}",
                entry.size,
                output.len()
            )));
        }
        Ok(output)
    }
}

impl std::fmt::Debug for PakArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakArchive")
            .field("name", &self.name)
            .field("version", &self.footer.version)
            .field("entries", &self.index.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::{hashed_pak, legacy_pak, FileSpec};
    use std::io::Write;

    fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_open_and_read_stored_entries() {
        let files = vec![
            FileSpec::stored("Maps/level.umap", b"map-bytes"),
            FileSpec::stored("notes.txt", b"plain text"),
        ];
        let data = legacy_pak("Game/", 7, &[], &files, None);
        let file = write_temp(&data);

        let archive = PakArchive::open(file.path(), &KeyRing::new()).unwrap();
        assert_eq!(archive.version(), 7);
        assert_eq!(archive.mount_point(), "Game/");
        assert_eq!(archive.entry_count(), 2);

        assert_eq!(archive.read_index(0).unwrap(), b"map-bytes");
        assert_eq!(archive.read_index(1).unwrap(), b"plain text");
        assert!(archive.read_index(2).is_err());
    }

    #[test]
    fn test_read_compressed_entry() {
        let payload = b"compressible payload, compressible payload, compressible payload";
        let compressed = zlib_compress(payload);
        let mut spec = FileSpec::stored("big.bin", &compressed);
        spec.size = payload.len() as u64;
        spec.method_index = 1; // "Zlib" slot

        let data = legacy_pak("", 11, &["Zlib"], &[spec], None);
        let file = write_temp(&data);

        let archive = PakArchive::open(file.path(), &KeyRing::new()).unwrap();
        let entry = &archive.entries()[0].entry;
        assert_eq!(entry.size, payload.len() as u64);
        assert!(entry.compressed_size < entry.size);
        assert_eq!(archive.read_index(0).unwrap(), payload);
    }

    #[test]
    fn test_open_encrypted_archive_with_recovered_key() {
        let key = AesKey::parse("0xFEEDFACECAFEBEEF0011223344556677").unwrap();

        // Entry data encrypted with the same key, padded to block size.
        let payload = b"secret entry payload";
        let mut stored = payload.to_vec();
        while stored.len() % crypto::BLOCK_LEN != 0 {
            stored.push(0);
        }
        crate::crypto::tests::encrypt_in_place(&mut stored, &key);

        let mut spec = FileSpec::stored("vault.bin", &stored);
        spec.size = payload.len() as u64;
        spec.csize = payload.len() as u64;
        spec.encrypted = true;

        let dirs = vec![("Locked/", vec![spec])];
        let data = hashed_pak("Game/", 11, &[], &dirs, Some(&key), None);
        let file = write_temp(&data);

        let mut keys = KeyRing::new();
        keys.add_arg("wrong-key").unwrap();
        keys.add_arg("0xFEEDFACECAFEBEEF0011223344556677").unwrap();

        let archive = PakArchive::open(file.path(), &keys).unwrap();
        assert_eq!(archive.key_index(), Some(1));
        assert_eq!(archive.read_index(0).unwrap(), payload);
    }

    #[test]
    fn test_open_is_deterministic() {
        let files = vec![
            FileSpec::stored("b.bin", b"bbb"),
            FileSpec::stored("a.bin", b"aaa"),
        ];
        let data = legacy_pak("Base/", 7, &[], &files, None);
        let file = write_temp(&data);

        let first = PakArchive::open(file.path(), &KeyRing::new()).unwrap();
        let second = PakArchive::open(file.path(), &KeyRing::new()).unwrap();
        let rows_a: Vec<_> = first
            .entries()
            .iter()
            .map(|e| (e.directory.clone(), e.filename.clone(), e.entry.offset))
            .collect();
        let rows_b: Vec<_> = second
            .entries()
            .iter()
            .map(|e| (e.directory.clone(), e.filename.clone(), e.entry.offset))
            .collect();
        assert_eq!(rows_a, rows_b);
    }
}
