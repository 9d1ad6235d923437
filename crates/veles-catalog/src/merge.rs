//! The archive merger: open, decode, register, pair, classify.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use veles_package::{is_package_extension, PackageStream, PackageSummary, SPLIT_DATA_EXTENSION};
use veles_pak::{KeyRing, PakArchive};

use crate::{
    Catalog, CatalogRecord, Diagnostic, EntryLocator, Error, RegisterOutcome, Result, Source,
};

/// One line of the final listing.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    /// Normalized directory path.
    pub directory: &'a str,
    /// Bare file name.
    pub filename: &'a str,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Whether the record parsed as a package.
    pub is_package: bool,
    /// Export class tallies for packages.
    pub classes: Option<veles_package::ClassCounts>,
}

/// The finished catalog plus everything it borrows from.
///
/// Sources stay open for the lifetime of the result so records can be
/// streamed on demand (package data reads).
#[derive(Debug)]
pub struct MergeResult {
    sources: Vec<Source>,
    catalog: Catalog,
    /// Non-fatal conditions observed during the merge.
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a unified catalog from a list of input paths.
///
/// Paths are processed in ascending case-insensitive name order so that
/// later (patch) archives override earlier (base) ones. Every failure
/// short of archive-internal corruption is non-fatal: the offending path
/// is skipped and the run continues.
pub fn merge(paths: &[PathBuf], keys: &KeyRing) -> MergeResult {
    let mut ordered: Vec<&PathBuf> = paths.iter().collect();
    ordered.sort_by_cached_key(|p| {
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        (name, p.to_string_lossy().into_owned())
    });

    let mut merger = Merger {
        sources: Vec::new(),
        catalog: Catalog::new(),
        diagnostics: Vec::new(),
    };

    for path in ordered {
        merger.open_path(path, keys);
    }
    merger.scan_packages();
    merger.pair_split_files();

    MergeResult {
        sources: merger.sources,
        catalog: merger.catalog,
        diagnostics: merger.diagnostics,
    }
}

struct Merger {
    sources: Vec<Source>,
    catalog: Catalog,
    diagnostics: Vec<Diagnostic>,
}

impl Merger {
    fn open_path(&mut self, path: &Path, keys: &KeyRing) {
        let is_container = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pak"));

        if is_container {
            self.open_container(path, keys);
        } else {
            self.open_loose(path);
        }
    }

    fn open_container(&mut self, path: &Path, keys: &KeyRing) {
        let archive = match PakArchive::open(path, keys) {
            Ok(archive) => archive,
            Err(e) => {
                let diag = if e.is_corruption() {
                    Diagnostic::ArchiveCorrupt {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                } else {
                    Diagnostic::ArchiveSkipped {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                };
                warn!("{diag}");
                self.diagnostics.push(diag);
                return;
            }
        };

        debug!(
            archive = archive.name(),
            version = archive.version(),
            entries = archive.entry_count(),
            "decoded container directory"
        );

        let source_index = self.sources.len();
        let registrations: Vec<(String, String, u64, EntryLocator)> = archive
            .entries()
            .iter()
            .enumerate()
            .map(|(i, e)| {
                (
                    e.directory.clone(),
                    e.filename.clone(),
                    e.entry.size,
                    EntryLocator::for_pak_entry(source_index, i as u32, &e.entry),
                )
            })
            .collect();
        self.sources.push(Source::Pak(archive));
        let archive_name = self.sources[source_index].name().to_string();

        for (directory, filename, size, locator) in registrations {
            let (_, outcome) = self
                .catalog
                .register(directory.clone(), filename.clone(), size, locator);
            match outcome {
                RegisterOutcome::Inserted => {}
                RegisterOutcome::Overridden => {
                    let diag = Diagnostic::EntryOverridden {
                        directory,
                        filename,
                        winner: archive_name.clone(),
                    };
                    debug!("{diag}");
                    self.diagnostics.push(diag);
                }
                RegisterOutcome::KeptFirst => {
                    let diag = Diagnostic::DuplicateEntry {
                        directory,
                        filename,
                        archive: archive_name.clone(),
                    };
                    warn!("{diag}");
                    self.diagnostics.push(diag);
                }
            }
        }
    }

    fn open_loose(&mut self, path: &Path) {
        if path.extension().is_none() {
            let diag = Diagnostic::ArchiveSkipped {
                path: path.to_path_buf(),
                reason: "no file extension".into(),
            };
            warn!("{diag}");
            self.diagnostics.push(diag);
            return;
        }

        let size = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                let diag = Diagnostic::ArchiveSkipped {
                    path: path.to_path_buf(),
                    reason: "not a regular file".into(),
                };
                warn!("{diag}");
                self.diagnostics.push(diag);
                return;
            }
            Err(e) => {
                let diag = Diagnostic::ArchiveSkipped {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                };
                warn!("{diag}");
                self.diagnostics.push(diag);
                return;
            }
        };

        let (directory, filename) = split_loose_path(path);
        let source_index = self.sources.len();
        self.sources.push(Source::Loose {
            path: path.to_path_buf(),
            name: filename.clone(),
            size,
        });
        self.catalog.register(
            directory,
            filename,
            size,
            EntryLocator::for_loose_file(source_index, size),
        );
    }

    /// Parse every package-typed record's summary. A failure leaves the
    /// record as a plain file.
    fn scan_packages(&mut self) {
        for idx in 0..self.catalog.len() {
            let Some(record) = self.catalog.get(idx) else {
                continue;
            };
            let is_package = record
                .extension()
                .is_some_and(is_package_extension);
            if !is_package {
                continue;
            }

            let directory = record.directory.clone();
            let filename = record.filename.clone();
            let parsed = self.sources[record.locator.source]
                .read(&record.locator)
                .and_then(|bytes| PackageSummary::parse(&bytes).map_err(Error::from));

            match parsed {
                Ok(summary) => {
                    if let Some(record) = self.catalog.get_mut(idx) {
                        record.package = Some(summary);
                    }
                }
                Err(e) => {
                    let diag = Diagnostic::PackageParseFailed {
                        directory,
                        filename,
                        reason: e.to_string(),
                    };
                    debug!("{diag}");
                    self.diagnostics.push(diag);
                }
            }
        }
    }

    /// Pair header-only packages with their data siblings and mark the
    /// siblings used so they vanish from the final listing.
    fn pair_split_files(&mut self) {
        for idx in 0..self.catalog.len() {
            let (directory, filename, sibling_name) = {
                let Some(record) = self.catalog.get(idx) else {
                    continue;
                };
                let Some(summary) = &record.package else {
                    continue;
                };
                if u64::from(summary.total_header_size) != record.size {
                    continue;
                }
                // Header-only package: the data lives in a sibling with the
                // container family's fixed data extension.
                let Some((stem, _)) = record.filename.rsplit_once('.') else {
                    continue;
                };
                (
                    record.directory.clone(),
                    record.filename.clone(),
                    format!("{stem}.{SPLIT_DATA_EXTENSION}"),
                )
            };

            match self.catalog.lookup(&directory, &sibling_name) {
                Some(sibling) if sibling != idx => {
                    if let Some(s) = self.catalog.get_mut(sibling) {
                        s.used = true;
                    }
                    if let Some(r) = self.catalog.get_mut(idx) {
                        r.data_sibling = Some(sibling);
                    }
                }
                _ => {
                    let diag = Diagnostic::MissingSplitSibling {
                        directory,
                        filename,
                    };
                    warn!("{diag}");
                    self.diagnostics.push(diag);
                }
            }
        }
    }
}

impl MergeResult {
    /// The finished catalog.
    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The opened sources, in processing order.
    #[inline]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// The final listing: every non-used record in case-insensitive
    /// (directory, filename) order.
    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows: Vec<&CatalogRecord> = self
            .catalog
            .records()
            .iter()
            .filter(|r| !r.used)
            .collect();
        rows.sort_by_cached_key(|r| {
            (
                r.directory.to_ascii_lowercase(),
                r.filename.to_ascii_lowercase(),
            )
        });
        rows.into_iter()
            .map(|r| Row {
                directory: &r.directory,
                filename: &r.filename,
                size: r.size,
                is_package: r.is_package(),
                classes: r.package.as_ref().map(|p| p.classes),
            })
            .collect()
    }

    /// Print one `directory/filename` line per listing row.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in self.rows() {
            if row.directory.is_empty() {
                writeln!(out, "{}", row.filename)?;
            } else {
                writeln!(out, "{}/{}", row.directory, row.filename)?;
            }
        }
        Ok(())
    }

    /// Read a record's uncompressed bytes.
    pub fn read_record(&self, index: usize) -> Result<Vec<u8>> {
        let record = self.catalog.get(index).ok_or(Error::RecordNotFound(index))?;
        let source = self
            .sources
            .get(record.locator.source)
            .ok_or(Error::RecordNotFound(index))?;
        source.read(&record.locator)
    }

    /// Open a package record as a logical byte stream, spliced with its
    /// data sibling when one was paired.
    pub fn open_package_stream(&self, index: usize) -> Result<PackageStream> {
        let record = self.catalog.get(index).ok_or(Error::RecordNotFound(index))?;
        let header = self.read_record(index)?;
        match record.data_sibling {
            Some(sibling) => {
                let data = self.read_record(sibling)?;
                Ok(PackageStream::spliced(header, data))
            }
            None => Ok(PackageStream::new(header)),
        }
    }
}

fn split_loose_path(path: &Path) -> (String, String) {
    let normalized = path.to_string_lossy().replace('\\', "/");
    match normalized.rfind('/') {
        Some(i) => (
            normalized[..i].trim_end_matches('/').to_string(),
            normalized[i + 1..].to_string(),
        ),
        None => (String::new(), normalized),
    }
}
