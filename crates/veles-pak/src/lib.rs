//! Container archive reader for Unreal-style game asset archives.
//!
//! A container bundles many logical files behind a single directory index
//! stored near the end of the file. This crate decodes that index in both
//! of its on-disk variants:
//!
//! - **Legacy** (footer version < 10): a linear list of name + fixed-layout
//!   entry records
//! - **Modern** (footer version >= 10): a hashed-directory layout with a
//!   shared encoded-entries block, a deduplicated decoded-entries array, and
//!   a separately stored full directory index
//!
//! Encrypted indices are handled by brute-forcing a caller-supplied candidate
//! key list against a mount-point validity check; the winning key is retained
//! on the archive for later entry reads.
//!
//! # Example
//!
//! ```no_run
//! use veles_pak::{KeyRing, PakArchive};
//!
//! let mut keys = KeyRing::new();
//! keys.add_arg("0x000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F")?;
//!
//! let archive = PakArchive::open("Content.pak", &keys)?;
//! for entry in archive.entries() {
//!     println!("{}/{}: {} bytes", entry.directory, entry.filename, entry.entry.size);
//! }
//! # Ok::<(), veles_pak::Error>(())
//! ```

mod archive;
mod crypto;
mod decompress;
mod entry;
mod error;
mod footer;
mod index;
mod keys;

pub use archive::PakArchive;
pub use crypto::recover_key;
pub use entry::{CompressionMethod, EntryLocation, PakEntry, PakEntryRecord};
pub use error::{Error, Result};
pub use footer::PakFooter;
pub use index::{IndexEntry, PakIndex};
pub use keys::{AesKey, KeyRing};
