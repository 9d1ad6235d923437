//! Veles - game asset archive indexing library.
//!
//! This crate provides a unified interface to the Veles library ecosystem
//! for cataloguing Unreal-style game asset archives.
//!
//! # Crates
//!
//! - [`veles_common`] - Common utilities (binary reading, shared errors)
//! - [`veles_pak`] - Container archive reading (directory index + key recovery)
//! - [`veles_package`] - Package summary scanning and classification
//! - [`veles_catalog`] - Deduplicating catalog and multi-archive merge
//!
//! # Example
//!
//! ```no_run
//! use veles::prelude::*;
//! use std::path::PathBuf;
//!
//! let mut keys = KeyRing::new();
//! keys.add_arg("0x0123456789ABCDEF0123456789ABCDEF")?;
//!
//! let paths = vec![PathBuf::from("base.pak"), PathBuf::from("patch.pak")];
//! let result = merge(&paths, &keys);
//! for row in result.rows() {
//!     println!("{}/{}", row.directory, row.filename);
//! }
//! # Ok::<(), veles::pak::Error>(())
//! ```

// Re-export all sub-crates
pub use veles_catalog as catalog;
pub use veles_common as common;
pub use veles_package as package;
pub use veles_pak as pak;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use veles_catalog::{merge, Catalog, Diagnostic, MergeResult, Row};
    pub use veles_common::BinaryReader;
    pub use veles_package::{AssetClass, ClassCounts, PackageStream, PackageSummary};
    pub use veles_pak::{AesKey, KeyRing, PakArchive};
}

// Re-export commonly used entry points at the crate root
pub use veles_catalog::merge;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
