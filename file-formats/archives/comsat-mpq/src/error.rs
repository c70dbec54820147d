//! Error types for the MPQ library

use std::io;
use thiserror::Error;

/// Result type alias for MPQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MPQ operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid MPQ format or unrecognized byte source
    #[error("Invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// Unsupported MPQ version
    #[error("Unsupported MPQ version: {0}")]
    UnsupportedVersion(u16),

    /// Structurally inconsistent archive data (bad sector offsets, tables)
    #[error("Corrupted archive: {0}")]
    Corrupted(String),

    /// File not found in archive
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Hash table error
    #[error("Hash table error: {0}")]
    HashTable(String),

    /// Block table error
    #[error("Block table error: {0}")]
    BlockTable(String),

    /// Encryption/decryption error
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// Compression/decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// The byte source ended before a declared structure did
    #[error("Truncated data: {0}")]
    Truncated(String),

    /// A member name that cannot be mapped onto the filesystem safely
    #[error("Unsafe member name {name:?}: {reason}")]
    UnsafePath {
        /// Member name as stored in the archive
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// Two members resolve to the same output name or path
    #[error("{name:?} collides with {existing:?}")]
    NameCollision {
        /// Member that lost the collision
        name: String,
        /// Member that already holds the name or path
        existing: String,
    },

    /// Checksum mismatch
    #[error("Checksum mismatch for {file}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// File or table name
        file: String,
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Corrupted error
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        Error::Corrupted(msg.into())
    }

    /// Create a new Crypto error
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Create a new HashTable error
    pub fn hash_table<S: Into<String>>(msg: S) -> Self {
        Error::HashTable(msg.into())
    }

    /// Create a new BlockTable error
    pub fn block_table<S: Into<String>>(msg: S) -> Self {
        Error::BlockTable(msg.into())
    }

    /// Create a new Truncated error
    pub fn truncated<S: Into<String>>(msg: S) -> Self {
        Error::Truncated(msg.into())
    }

    /// Wrap an I/O error raised while reading `what`.
    ///
    /// An early end of the byte source becomes [`Error::Truncated`], anything
    /// else stays an I/O error.
    pub fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated(format!("unexpected end of data while reading {what}"))
        } else {
            Error::Io(err)
        }
    }

    /// Check if this error indicates the archive is corrupted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::Corrupted(_)
                | Error::HashTable(_)
                | Error::BlockTable(_)
                | Error::Truncated(_)
                | Error::ChecksumMismatch { .. }
        )
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors concern a single member; the archive handle stays
    /// usable afterwards.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_)
                | Error::UnsafePath { .. }
                | Error::NameCollision { .. }
                | Error::Crypto(_)
                | Error::Compression(_)
                | Error::ChecksumMismatch { .. }
        )
    }
}
