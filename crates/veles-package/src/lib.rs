//! Package summary scanning.
//!
//! Structured packages carry a header with name, import, and export tables.
//! This crate reads just enough of a package to answer two questions:
//!
//! - Is this a header-only half of a split file? (declared header size
//!   equals the physical file size)
//! - What does it contain? (export class names tallied into four tracked
//!   categories)
//!
//! No object data is decoded here; deeper conversion belongs to external
//! collaborators.

mod classify;
mod error;
mod stream;
mod summary;

pub use classify::{classify_class_name, AssetClass, ClassCounts};
pub use error::{Error, Result};
pub use stream::PackageStream;
pub use summary::{ObjectExport, ObjectImport, PackageSummary};

#[doc(hidden)]
pub use summary::build;

/// File extensions treated as structured packages.
pub const PACKAGE_EXTENSIONS: &[&str] = &["uasset", "umap"];

/// Extension of the data-half sibling of a header-only package.
pub const SPLIT_DATA_EXTENSION: &str = "uexp";

/// Whether a file extension names a structured package.
pub fn is_package_extension(ext: &str) -> bool {
    PACKAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}
