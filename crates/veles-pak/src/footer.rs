//! Archive footer record.
//!
//! The footer sits at the very end of a container and points at the
//! directory index. It is located by scanning backwards for the magic
//! signature, so trailing padding does not matter.

use veles_common::BinaryReader;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{CompressionMethod, Error, Result};

/// Fixed part of the footer, following the one-byte encryption flag and
/// read starting at the magic.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct FooterRecord {
    /// Footer signature
    pub magic: u32,
    /// Format version; gates legacy vs modern index decoding
    pub version: u32,
    /// Absolute offset of the index block
    pub index_offset: u64,
    /// Size of the index block in bytes
    pub index_size: u64,
    /// Integrity hash of the index block (not verified)
    pub index_hash: [u8; 20],
}

/// Parsed archive footer.
#[derive(Debug, Clone)]
pub struct PakFooter {
    /// Whether the index block (and full directory index) is encrypted.
    pub encrypted_index: bool,
    /// Format version.
    pub version: u32,
    /// Absolute offset of the index block.
    pub index_offset: u64,
    /// Size of the index block in bytes.
    pub index_size: u64,
    /// Named compression method slots (version >= 8). Unused slots are empty.
    pub compression_methods: Vec<String>,
}

impl PakFooter {
    /// Footer signature as u32.
    pub const MAGIC: u32 = 0x5A6F_12E1;

    /// Footer signature bytes (little-endian).
    pub const MAGIC_BYTES: [u8; 4] = [0xE1, 0x12, 0x6F, 0x5A];

    /// First version carrying named compression method slots.
    pub const VERSION_NAMED_METHODS: u32 = 8;

    /// First version using the modern hashed-directory index.
    pub const VERSION_HASHED_INDEX: u32 = 10;

    /// Latest version this reader understands.
    pub const VERSION_LATEST: u32 = 11;

    /// Legacy method tag for the custom compressor of a few old releases.
    /// Resolved to [`CompressionMethod::Detect`] rather than a name.
    pub const LEGACY_METHOD_CUSTOM: u32 = 4;

    /// Number of method name slots in the footer.
    pub const METHOD_SLOTS: usize = 5;

    /// Bytes per method name slot (NUL padded).
    pub const METHOD_NAME_LEN: usize = 32;

    /// How far from the end of the file the magic is searched for.
    const SEARCH_WINDOW: usize = 4096;

    /// Locate and parse the footer in an archive's bytes.
    pub fn find(data: &[u8]) -> Result<Self> {
        let window_start = data.len().saturating_sub(Self::SEARCH_WINDOW);

        // The encryption flag byte precedes the magic, so a match at
        // offset 0 can never be a real footer.
        let mut candidate = None;
        let mut pos = data.len().saturating_sub(Self::MAGIC_BYTES.len());
        while pos > window_start {
            if data[pos..pos + 4] == Self::MAGIC_BYTES {
                candidate = Some(pos);
                break;
            }
            pos -= 1;
        }

        let magic_at = candidate.ok_or(Error::FooterNotFound)?;
        Self::parse_at(data, magic_at)
    }

    fn parse_at(data: &[u8], magic_at: usize) -> Result<Self> {
        let encrypted_index = data[magic_at - 1] != 0;

        let mut reader = BinaryReader::new(&data[magic_at..]);
        let record: FooterRecord = reader.read_struct()?;

        if record.magic != Self::MAGIC {
            return Err(Error::InvalidMagic {
                expected: Self::MAGIC,
                actual: record.magic,
            });
        }
        if record.version == 0 || record.version > Self::VERSION_LATEST {
            return Err(Error::UnsupportedVersion(record.version));
        }

        let mut compression_methods = Vec::new();
        if record.version >= Self::VERSION_NAMED_METHODS {
            for _ in 0..Self::METHOD_SLOTS {
                let slot = reader.read_bytes(Self::METHOD_NAME_LEN)?;
                let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
                let name = std::str::from_utf8(&slot[..end])
                    .map_err(veles_common::Error::from)
                    .map_err(Error::from)?;
                compression_methods.push(name.to_string());
            }
        }

        let index_end = record
            .index_offset
            .checked_add(record.index_size)
            .ok_or_else(|| Error::InvalidIndex("index range overflows".into()))?;
        if index_end > data.len() as u64 {
            return Err(Error::InvalidIndex(format!(
                "index block [{}..{}] exceeds archive size {}",
                { record.index_offset },
                index_end,
                data.len()
            )));
        }

        Ok(Self {
            encrypted_index,
            version: record.version,
            index_offset: record.index_offset,
            index_size: record.index_size,
            compression_methods,
        })
    }

    /// Whether this archive uses the modern hashed-directory index.
    #[inline]
    pub fn is_hashed_index(&self) -> bool {
        self.version >= Self::VERSION_HASHED_INDEX
    }

    /// Resolve a raw compression method index from an entry record.
    ///
    /// Index 0 always means stored/uncompressed. For name-table versions a
    /// nonzero index addresses the footer's method slots at `index - 1`; for
    /// older versions a small set of well-known tags applies, with the
    /// custom tag mapping to the detect-from-content sentinel.
    pub fn resolve_method(&self, raw_index: u32) -> Result<CompressionMethod> {
        if raw_index == 0 {
            return Ok(CompressionMethod::Store);
        }

        if self.version >= Self::VERSION_NAMED_METHODS {
            let name = self
                .compression_methods
                .get(raw_index as usize - 1)
                .filter(|n| !n.is_empty())
                .ok_or(Error::UnsupportedMethod(raw_index))?;
            Ok(CompressionMethod::Named(name.as_str().into()))
        } else {
            match raw_index {
                1 => Ok(CompressionMethod::Named("Zlib".into())),
                2 => Ok(CompressionMethod::Named("Gzip".into())),
                Self::LEGACY_METHOD_CUSTOM => Ok(CompressionMethod::Detect),
                other => Err(Error::UnsupportedMethod(other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_find_modern_footer() {
        let mut data = vec![0u8; 64]; // fake index block
        write_footer(&mut data, false, 11, 0, 64, &["Zlib", "Zstd"]);

        let footer = PakFooter::find(&data).unwrap();
        assert!(!footer.encrypted_index);
        assert_eq!(footer.version, 11);
        assert_eq!(footer.index_offset, 0);
        assert_eq!(footer.index_size, 64);
        assert!(footer.is_hashed_index());
        assert_eq!(footer.compression_methods[0], "Zlib");
        assert_eq!(footer.compression_methods[1], "Zstd");
        assert_eq!(footer.compression_methods[2], "");
    }

    #[test]
    fn test_find_legacy_footer_without_method_table() {
        let mut data = vec![0u8; 32];
        write_footer(&mut data, true, 7, 0, 32, &[]);

        let footer = PakFooter::find(&data).unwrap();
        assert!(footer.encrypted_index);
        assert_eq!(footer.version, 7);
        assert!(!footer.is_hashed_index());
        assert!(footer.compression_methods.is_empty());
    }

    #[test]
    fn test_footer_not_found() {
        let data = vec![0u8; 256];
        assert!(matches!(PakFooter::find(&data), Err(Error::FooterNotFound)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = vec![0u8; 16];
        write_footer(&mut data, false, 99, 0, 16, &[]);
        assert!(matches!(
            PakFooter::find(&data),
            Err(Error::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut data = Vec::new();
        write_footer(&mut data, false, 11, 1000, 64, &[]);
        assert!(matches!(
            PakFooter::find(&data),
            Err(Error::InvalidIndex(_))
        ));
    }

    #[test]
    fn test_resolve_named_method() {
        let mut data = vec![0u8; 16];
        write_footer(&mut data, false, 11, 0, 16, &["Zlib", "Oodle"]);
        let footer = PakFooter::find(&data).unwrap();

        assert_eq!(
            footer.resolve_method(0).unwrap(),
            CompressionMethod::Store
        );
        assert_eq!(
            footer.resolve_method(1).unwrap(),
            CompressionMethod::Named("Zlib".into())
        );
        assert_eq!(
            footer.resolve_method(2).unwrap(),
            CompressionMethod::Named("Oodle".into())
        );
        assert!(footer.resolve_method(3).is_err()); // empty slot
        assert!(footer.resolve_method(6).is_err()); // out of range
    }

    #[test]
    fn test_resolve_legacy_method() {
        let mut data = vec![0u8; 16];
        write_footer(&mut data, false, 7, 0, 16, &[]);
        let footer = PakFooter::find(&data).unwrap();

        assert_eq!(footer.resolve_method(0).unwrap(), CompressionMethod::Store);
        assert_eq!(
            footer.resolve_method(1).unwrap(),
            CompressionMethod::Named("Zlib".into())
        );
        assert_eq!(footer.resolve_method(4).unwrap(), CompressionMethod::Detect);
        assert!(footer.resolve_method(3).is_err());
    }
}
