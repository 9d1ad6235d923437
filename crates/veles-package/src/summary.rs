//! Package summary parsing: header plus name/import/export tables.

use veles_common::BinaryReader;

use crate::classify::ClassCounts;
use crate::{Error, Result};

/// One row of the import table. Both fields index the name table.
#[derive(Debug, Clone, Copy)]
pub struct ObjectImport {
    /// Name of the imported object's class.
    pub class_name: u32,
    /// Name of the imported object itself.
    pub object_name: u32,
}

/// One row of the export table.
#[derive(Debug, Clone, Copy)]
pub struct ObjectExport {
    /// Package index of the export's class: negative into the import
    /// table, positive into the export table, zero for none.
    pub class_index: i32,
    /// Name-table index of the exported object's name.
    pub object_name: u32,
    /// Size of the export's serialized data.
    pub serial_size: u64,
    /// Offset of the export's serialized data in the logical package.
    pub serial_offset: u64,
}

/// Parsed package summary: everything the classifier and split-file logic
/// need, nothing more.
#[derive(Debug, Clone)]
pub struct PackageSummary {
    /// Package format version.
    pub version: u32,
    /// Declared total header size. Equal to the physical file size for the
    /// header half of a split file.
    pub total_header_size: u32,
    /// Name table.
    pub names: Vec<String>,
    /// Import table.
    pub imports: Vec<ObjectImport>,
    /// Export table.
    pub exports: Vec<ObjectExport>,
    /// Export class tallies, computed once at parse time.
    pub classes: ClassCounts,
}

impl PackageSummary {
    /// Package signature.
    pub const MAGIC: u32 = 0x9E2A_83C1;

    /// Parse a package's summary from its leading bytes.
    ///
    /// `data` must cover at least the header region; table offsets are
    /// validated against the slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        let magic = reader.read_u32()?;
        if magic != Self::MAGIC {
            return Err(Error::InvalidMagic {
                expected: Self::MAGIC,
                actual: magic,
            });
        }

        let version = reader.read_u32()?;
        let total_header_size = reader.read_u32()?;
        let name_count = reader.read_u32()?;
        let name_offset = reader.read_u32()?;
        let import_count = reader.read_u32()?;
        let import_offset = reader.read_u32()?;
        let export_count = reader.read_u32()?;
        let export_offset = reader.read_u32()?;

        let names = Self::parse_names(data, name_offset, name_count)?;
        let imports = Self::parse_imports(data, import_offset, import_count)?;
        let exports = Self::parse_exports(data, export_offset, export_count)?;

        let mut summary = Self {
            version,
            total_header_size,
            names,
            imports,
            exports,
            classes: ClassCounts::default(),
        };
        summary.classes = ClassCounts::tally(&summary);
        Ok(summary)
    }

    fn table_reader<'a>(data: &'a [u8], offset: u32, table: &'static str) -> Result<BinaryReader<'a>> {
        if offset as usize > data.len() {
            return Err(Error::MalformedTable(format!(
                "{table} table offset {offset} exceeds data size {}",
                data.len()
            )));
        }
        let mut reader = BinaryReader::new(data);
        reader.seek(offset as usize);
        Ok(reader)
    }

    fn parse_names(data: &[u8], offset: u32, count: u32) -> Result<Vec<String>> {
        let mut reader = Self::table_reader(data, offset, "name")?;
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            names.push(reader.read_indexed_string()?);
        }
        Ok(names)
    }

    fn parse_imports(data: &[u8], offset: u32, count: u32) -> Result<Vec<ObjectImport>> {
        let mut reader = Self::table_reader(data, offset, "import")?;
        let mut imports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            imports.push(ObjectImport {
                class_name: reader.read_u32()?,
                object_name: reader.read_u32()?,
            });
        }
        Ok(imports)
    }

    fn parse_exports(data: &[u8], offset: u32, count: u32) -> Result<Vec<ObjectExport>> {
        let mut reader = Self::table_reader(data, offset, "export")?;
        let mut exports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            exports.push(ObjectExport {
                class_index: reader.read_i32()?,
                object_name: reader.read_u32()?,
                serial_size: reader.read_u64()?,
                serial_offset: reader.read_u64()?,
            });
        }
        Ok(exports)
    }

    /// Look up a name-table entry.
    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Resolve an export's class name through its package index.
    ///
    /// Negative indices address the import table, positive ones other
    /// exports, zero means the export has no class.
    pub fn export_class_name(&self, export: &ObjectExport) -> Option<&str> {
        if export.class_index < 0 {
            let import = self
                .imports
                .get((-(export.class_index as i64 + 1)) as usize)?;
            self.name(import.object_name)
        } else if export.class_index > 0 {
            let target = self.exports.get(export.class_index as usize - 1)?;
            self.name(target.object_name)
        } else {
            None
        }
    }

    /// Number of exports in the package.
    #[inline]
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }
}

/// Test-side package builder shared with the catalog crate's tests.
#[doc(hidden)]
pub mod build {
    use super::PackageSummary;

    /// Serialize a minimal package: header, name table, imports referencing
    /// class names, exports classed by import index.
    ///
    /// `exports` pairs an object name with the import-table row holding its
    /// class. `extra_data` is appended after the header so the declared
    /// header size differs from the file size (a non-split package).
    pub fn package_bytes(
        class_names: &[&str],
        exports: &[(&str, usize)],
        extra_data: &[u8],
    ) -> Vec<u8> {
        // Name table: class names first, then export object names.
        let mut names: Vec<String> = class_names.iter().map(|s| s.to_string()).collect();
        let export_name_base = names.len() as u32;
        for (name, _) in exports {
            names.push((*name).to_string());
        }

        let header_size = 9 * 4;
        let mut name_block = Vec::new();
        for name in &names {
            name_block.extend_from_slice(&(name.len() as i32 + 1).to_le_bytes());
            name_block.extend_from_slice(name.as_bytes());
            name_block.push(0);
        }

        let name_offset = header_size;
        let import_offset = name_offset + name_block.len();
        let import_len = class_names.len() * 8;
        let export_offset = import_offset + import_len;
        let export_len = exports.len() * 24;
        let total_header_size = (export_offset + export_len) as u32;

        let mut out = Vec::new();
        out.extend_from_slice(&PackageSummary::MAGIC.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes()); // version
        out.extend_from_slice(&total_header_size.to_le_bytes());
        out.extend_from_slice(&(names.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name_offset as u32).to_le_bytes());
        out.extend_from_slice(&(class_names.len() as u32).to_le_bytes());
        out.extend_from_slice(&(import_offset as u32).to_le_bytes());
        out.extend_from_slice(&(exports.len() as u32).to_le_bytes());
        out.extend_from_slice(&(export_offset as u32).to_le_bytes());
        out.extend_from_slice(&name_block);

        for i in 0..class_names.len() as u32 {
            out.extend_from_slice(&i.to_le_bytes()); // class_name
            out.extend_from_slice(&i.to_le_bytes()); // object_name
        }

        let mut serial_offset = total_header_size as u64;
        for (i, (_, class_import)) in exports.iter().enumerate() {
            let class_index = -((*class_import as i32) + 1);
            out.extend_from_slice(&class_index.to_le_bytes());
            out.extend_from_slice(&(export_name_base + i as u32).to_le_bytes());
            out.extend_from_slice(&4u64.to_le_bytes()); // serial_size
            out.extend_from_slice(&serial_offset.to_le_bytes());
            serial_offset += 4;
        }

        debug_assert_eq!(out.len(), total_header_size as usize);
        out.extend_from_slice(extra_data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::build::package_bytes;
    use super::*;

    #[test]
    fn test_parse_summary() {
        let data = package_bytes(
            &["StaticMesh", "Texture2D"],
            &[("SM_Rock", 0), ("SM_Tree", 0), ("T_Bark", 1)],
            b"object data",
        );
        let summary = PackageSummary::parse(&data).unwrap();

        assert_eq!(summary.version, 1);
        assert_eq!(summary.names.len(), 5);
        assert_eq!(summary.imports.len(), 2);
        assert_eq!(summary.export_count(), 3);
        assert_eq!(summary.total_header_size as usize, data.len() - 11);

        let class_names: Vec<_> = summary
            .exports
            .iter()
            .map(|e| summary.export_class_name(e))
            .collect();
        assert_eq!(
            class_names,
            vec![Some("StaticMesh"), Some("StaticMesh"), Some("Texture2D")]
        );
        assert_eq!(summary.name(summary.exports[0].object_name), Some("SM_Rock"));
    }

    #[test]
    fn test_header_only_package() {
        let data = package_bytes(&["SkeletalMesh"], &[("SK_Body", 0)], b"");
        let summary = PackageSummary::parse(&data).unwrap();
        assert_eq!(summary.total_header_size as usize, data.len());
    }

    #[test]
    fn test_invalid_magic() {
        let data = vec![0u8; 64];
        assert!(matches!(
            PackageSummary::parse(&data),
            Err(Error::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_truncated_table() {
        let mut data = package_bytes(&["StaticMesh"], &[("SM_A", 0)], b"");
        data.truncate(data.len() - 8);
        assert!(PackageSummary::parse(&data).is_err());
    }

    #[test]
    fn test_empty_tables() {
        let data = package_bytes(&[], &[], b"");
        let summary = PackageSummary::parse(&data).unwrap();
        assert!(summary.exports.is_empty());
        assert_eq!(summary.classes, ClassCounts::default());
    }
}
