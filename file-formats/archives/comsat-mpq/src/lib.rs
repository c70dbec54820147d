//! # comsat_mpq - MPQ archive reader for StarCraft II
//!
//! A safe, read-only implementation of the MPQ (Mo'PaQ) archive format as
//! used by StarCraft II maps (`.SC2Map`, `.s2ma`) and replays
//! (`.SC2Replay`).
//!
//! ## Features
//!
//! - Header discovery at 512-byte aligned offsets, including the user data
//!   header that replays carry in front of the archive
//! - Encrypted hash and block tables (v1 and v2 layouts, hi-block table)
//! - Sector decoding with zlib, bzip2, LZMA, PKWARE DCL and sparse codecs
//! - Encrypted and FIX_KEY files, per-sector Adler-32 verification
//! - Bulk extraction that keeps going when individual members fail
//!
//! ## Examples
//!
//! ```no_run
//! use comsat_mpq::Archive;
//!
//! # fn main() -> Result<(), comsat_mpq::Error> {
//! let mut archive = Archive::open("replay.SC2Replay")?;
//!
//! for name in archive.list_names()? {
//!     println!("{name}");
//! }
//!
//! let details = archive.read_file("replay.details")?;
//! # Ok(())
//! # }
//! ```
//!
//! Extracting everything while collecting per-member failures:
//!
//! ```no_run
//! use comsat_mpq::{Archive, ExtractOptions, extract::extract_to_dir};
//!
//! # fn main() -> Result<(), comsat_mpq::Error> {
//! let mut archive = Archive::open("map.SC2Map")?;
//! let report = extract_to_dir(&mut archive, "map-extracted", &ExtractOptions::new())?;
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.name, failure.error);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod archive;
pub mod compression;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod header;
pub mod sector;
pub mod special_files;
pub mod tables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use archive::{
    Archive, ArchiveInfo, ExtractAll, ExtractFailure, FileEntry, FileInfo, OpenOptions,
    UserDataInfo,
};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, ExtractReport, sanitize_member_name};
pub use header::{FormatVersion, MpqHeader, UserDataHeader};
pub use tables::{BlockEntry, BlockFlags, BlockTable, HashEntry, HashSlot, HashTable};

pub use crypto::{decrypt_block, encrypt_block, hash_string, hash_type};

/// MPQ signature constants
pub mod signatures {
    /// Standard MPQ archive signature ('MPQ\x1A')
    pub const MPQ_ARCHIVE: u32 = crate::header::MPQ_HEADER_SIGNATURE;

    /// MPQ user data signature ('MPQ\x1B')
    pub const MPQ_USERDATA: u32 = crate::header::MPQ_USERDATA_SIGNATURE;
}

/// Sector size for a header's sector size shift
#[inline]
pub fn calculate_sector_size(block_size_shift: u16) -> usize {
    512 << block_size_shift
}

/// Check if a value is a power of two
#[inline]
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}
