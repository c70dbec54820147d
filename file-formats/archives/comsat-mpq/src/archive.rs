//! MPQ archive handling
//!
//! This module provides the [`Archive`] type, the read-only facade over a
//! byte source holding an MPQ archive. It supports:
//! - Header discovery through an optional user data header
//! - Encrypted hash and block tables, including the v2 hi-block table
//! - File extraction with decompression, decryption and sector CRCs
//! - Name enumeration through the (listfile)
//! - Bulk extraction that collects per-member failures

use crate::{
    Error, Result,
    crypto::file_key,
    header::{self, FormatVersion, MpqHeader, UserDataHeader},
    sector::{StoredFile, read_file_data},
    special_files::{LISTFILE_NAME, parse_listfile},
    tables::{BlockEntry, BlockFlags, BlockTable, HashTable, HiBlockTable},
};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Default lookahead window of the header scan
pub const DEFAULT_HEADER_SEARCH_LIMIT: u64 = 64 * 1024 * 1024;

/// Options for opening MPQ archives
///
/// # Examples
///
/// ```no_run
/// use comsat_mpq::{Archive, OpenOptions};
///
/// // Open with default options
/// let archive = Archive::open("replay.SC2Replay")?;
///
/// // Prefer German files and skip sector checksums
/// let archive = OpenOptions::new()
///     .locale(0x0407)
///     .verify_crc(false)
///     .open("map.SC2Map")?;
/// # Ok::<(), comsat_mpq::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// How far into the byte source the header scan looks (bytes)
    pub header_search_limit: u64,
    /// Preferred locale for hash table lookups (0 = neutral)
    pub locale: u16,
    /// Verify per-sector checksums of files that carry them
    pub verify_crc: bool,
}

impl OpenOptions {
    /// Create new default options
    ///
    /// - `header_search_limit` = 64 MiB
    /// - `locale` = 0 (neutral)
    /// - `verify_crc` = true
    pub fn new() -> Self {
        Self {
            header_search_limit: DEFAULT_HEADER_SEARCH_LIMIT,
            locale: 0,
            verify_crc: true,
        }
    }

    /// Set the lookahead window of the header scan
    pub fn header_search_limit(mut self, limit: u64) -> Self {
        self.header_search_limit = limit;
        self
    }

    /// Set the preferred locale
    pub fn locale(mut self, locale: u16) -> Self {
        self.locale = locale;
        self
    }

    /// Enable or disable sector checksum verification
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Open an archive file with these options
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened
    /// - `Error::InvalidFormat` if no MPQ header is found
    /// - `Error::Truncated` if the tables extend past the end of the file
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Archive> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = self.open_reader(BufReader::new(file))?;
        archive.path = Some(path.to_path_buf());
        Ok(archive)
    }

    /// Open an archive from any seekable byte source with these options
    pub fn open_reader<R: Read + Seek>(self, reader: R) -> Result<Archive<R>> {
        Archive::with_options(reader, self)
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An MPQ archive
///
/// All reading methods take `&mut self`: the archive owns its byte source
/// and seeks it for every read.
#[derive(Debug)]
pub struct Archive<R = BufReader<File>> {
    /// Path to the archive file, when opened from disk
    path: Option<PathBuf>,
    /// Byte source
    reader: R,
    /// Length of the byte source
    source_len: u64,
    /// Offset where the MPQ data starts in the byte source
    archive_offset: u64,
    /// Optional user data header
    user_data: Option<UserDataHeader>,
    /// MPQ header
    header: MpqHeader,
    /// Hash table
    hash_table: HashTable,
    /// Block table (hi-block words already merged)
    block_table: BlockTable,
    /// Whether a hi-block table was present
    has_hi_block_table: bool,
    /// Preferred locale
    locale: u16,
    /// Verify sector checksums
    verify_crc: bool,
    /// Names from the (listfile), built on first use
    listfile: Option<Vec<String>>,
}

impl Archive {
    /// Open an existing MPQ archive with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OpenOptions::default().open(path)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive held by an arbitrary byte source
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::with_options(reader, OpenOptions::default())
    }

    /// Open an archive held by an arbitrary byte source with options
    pub fn with_options(mut reader: R, options: OpenOptions) -> Result<Self> {
        let (archive_offset, user_data, header) =
            header::find_header(&mut reader, options.header_search_limit)?;
        let source_len = reader.seek(SeekFrom::End(0))?;

        log::debug!(
            "MPQ v{} at {:#x}: {} hash slots, {} blocks, sector size {}",
            header.format_version.number(),
            archive_offset,
            header.hash_table_size,
            header.block_table_size,
            header.sector_size()
        );

        header.validate_table_bounds(archive_offset, source_len)?;

        let hash_table = HashTable::read(
            &mut reader,
            header::table_offset(archive_offset, header.get_hash_table_pos())?,
            header.hash_table_size,
        )?;
        let mut block_table = BlockTable::read(
            &mut reader,
            header::table_offset(archive_offset, header.get_block_table_pos())?,
            header.block_table_size,
        )?;

        let mut has_hi_block_table = false;
        if let Some(hi_pos) = header.get_hi_block_table_pos() {
            let hi_offset = header::table_offset(archive_offset, hi_pos)?;
            let hi_table = HiBlockTable::read(&mut reader, hi_offset, header.block_table_size)?;
            block_table.apply_hi_block_table(&hi_table);
            has_hi_block_table = true;
            log::debug!("Merged hi-block table at {hi_offset:#x}");
        }

        Ok(Archive {
            path: None,
            reader,
            source_len,
            archive_offset,
            user_data,
            header,
            hash_table,
            block_table,
            has_hi_block_table,
            locale: options.locale,
            verify_crc: options.verify_crc,
            listfile: None,
        })
    }

    /// Get the archive header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Get the user data header, if the archive has one
    pub fn user_data(&self) -> Option<&UserDataHeader> {
        self.user_data.as_ref()
    }

    /// Get the offset of the archive header within the byte source
    pub fn archive_offset(&self) -> u64 {
        self.archive_offset
    }

    /// Get the path the archive was opened from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the hash table
    pub fn hash_table(&self) -> &HashTable {
        &self.hash_table
    }

    /// Get the block table
    pub fn block_table(&self) -> &BlockTable {
        &self.block_table
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> usize {
        self.header.sector_size()
    }

    /// Consume the archive and return the byte source
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Resolve a file name through the hash table
    ///
    /// Returns `None` when the name is not present, or when its slot points
    /// at a block that does not exist.
    pub fn find_file(&self, filename: &str) -> Option<FileInfo> {
        let (hash_index, hash_entry) = self.hash_table.find_file(filename, self.locale)?;
        let block_index = hash_entry.slot.block_index()? as usize;

        let Some(block) = self.block_table.get(block_index) else {
            log::warn!(
                "'{filename}' refers to block {block_index}, past the end of the block table"
            );
            return None;
        };

        if !block.exists() || block.is_delete_marker() {
            log::debug!("'{filename}' refers to removed block {block_index}");
            return None;
        }

        Some(FileInfo {
            filename: filename.to_string(),
            hash_index,
            block_index,
            file_pos: self.archive_offset + block.offset(),
            compressed_size: block.compressed_size as u64,
            file_size: block.file_size as u64,
            flags: block.flags,
            locale: hash_entry.locale,
        })
    }

    /// Check whether a file name resolves
    pub fn contains(&self, filename: &str) -> bool {
        self.find_file(filename).is_some()
    }

    /// Read a file's uncompressed contents
    ///
    /// # Errors
    /// - `Error::FileNotFound` if the name does not resolve
    /// - `Error::Compression` if a sector fails to decode
    /// - `Error::ChecksumMismatch` if sector verification fails
    /// - `Error::Truncated` if the byte source ends inside the file
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let info = self
            .find_file(name)
            .ok_or_else(|| Error::FileNotFound(name.to_string()))?;
        self.read_block(info.block_index, Some(name), name)
    }

    /// Decode block `block_index`. `name` provides the decryption key when
    /// it is known; `label` is used in messages.
    fn read_block(&mut self, block_index: usize, name: Option<&str>, label: &str) -> Result<Vec<u8>> {
        let entry: BlockEntry = *self.block_table.get(block_index).ok_or_else(|| {
            Error::block_table(format!("Block index {block_index} out of range"))
        })?;

        let file_start = self.archive_offset + entry.offset();
        let file_end = file_start + entry.compressed_size as u64;
        if entry.file_size > 0 && file_end > self.source_len {
            return Err(Error::truncated(format!(
                "{label} ends at {file_end:#x}, past the end of the archive ({:#x})",
                self.source_len
            )));
        }

        let key = name.map(|n| file_key(n, entry.file_pos, entry.file_size, entry.has_fix_key()));
        let stored = StoredFile {
            name: label,
            entry: &entry,
            key,
        };

        let sector_size = self.header.sector_size();
        read_file_data(
            &mut self.reader,
            file_start,
            &stored,
            sector_size,
            self.verify_crc,
        )
    }

    /// Ordered names from the (listfile)
    ///
    /// The listfile is read once and cached. Names that do not resolve in
    /// the hash table are dropped with a warning. An archive without a
    /// (listfile) yields an empty list.
    pub fn list_names(&mut self) -> Result<Vec<String>> {
        if let Some(names) = &self.listfile {
            return Ok(names.clone());
        }

        let names = self.load_listfile()?;
        self.listfile = Some(names.clone());
        Ok(names)
    }

    fn load_listfile(&mut self) -> Result<Vec<String>> {
        if !self.contains(LISTFILE_NAME) {
            log::debug!("Archive has no (listfile)");
            return Ok(Vec::new());
        }

        let data = self.read_file(LISTFILE_NAME)?;
        let names = parse_listfile(&data)
            .into_iter()
            .filter(|name| {
                let found = self.contains(name);
                if !found {
                    log::warn!("File '{name}' listed in (listfile) but not found in archive");
                }
                found
            })
            .collect();

        Ok(names)
    }

    /// List the files named by the (listfile) with their sizes and flags
    pub fn list(&mut self) -> Result<Vec<FileEntry>> {
        let names = self.list_names()?;

        Ok(names
            .into_iter()
            .filter_map(|name| {
                let info = self.find_file(&name)?;
                Some(FileEntry {
                    name,
                    size: info.file_size,
                    compressed_size: info.compressed_size,
                    flags: info.flags,
                    locale: info.locale,
                    block_index: info.block_index,
                })
            })
            .collect())
    }

    /// Decode every existing block.
    ///
    /// Blocks are named through the (listfile) where possible; the rest get
    /// the synthetic name `file_{block_index:08}.dat` and can only be decoded
    /// when they are not encrypted. Failures are collected per block and
    /// never stop the walk. An unreadable (listfile) only costs the names.
    /// A synthetic name that the (listfile) also uses is reported as
    /// [`Error::NameCollision`] and the listed member keeps the name.
    pub fn extract_all(&mut self) -> ExtractAll {
        let mut names = match self.list_names() {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Failed to read (listfile): {e}. Falling back to synthetic names.");
                Vec::new()
            }
        };
        if !names.iter().any(|n| n == LISTFILE_NAME) {
            names.push(LISTFILE_NAME.to_string());
        }

        let mut block_names: HashMap<usize, String> = HashMap::new();
        for name in names {
            if let Some(info) = self.find_file(&name) {
                block_names.entry(info.block_index).or_insert(name);
            }
        }

        // Listed names keep priority over synthetic names that spell them
        let listed: HashMap<String, String> = block_names
            .values()
            .map(|n| (n.to_ascii_lowercase(), n.clone()))
            .collect();

        let mut result = ExtractAll::default();
        for block_index in 0..self.block_table.size() {
            let Some(entry) = self.block_table.get(block_index) else {
                break;
            };
            if !entry.exists() || entry.is_delete_marker() {
                continue;
            }

            let known = block_names.get(&block_index).cloned();
            let name = known
                .clone()
                .unwrap_or_else(|| synthetic_name(block_index));

            if known.is_none()
                && let Some(existing) = listed.get(&name.to_ascii_lowercase())
            {
                log::warn!("Block {block_index} would be named {name}, which the (listfile) uses");
                result.failures.push(ExtractFailure {
                    error: Error::NameCollision {
                        name: name.clone(),
                        existing: existing.clone(),
                    },
                    name,
                    block_index: Some(block_index),
                });
                continue;
            }

            match self.read_block(block_index, known.as_deref(), &name) {
                Ok(data) => {
                    result.files.insert(name, data);
                }
                Err(error) => {
                    log::warn!("Failed to extract {name}: {error}");
                    result.failures.push(ExtractFailure {
                        name,
                        block_index: Some(block_index),
                        error,
                    });
                }
            }
        }

        log::debug!(
            "Extracted {} blocks, {} failed",
            result.files.len(),
            result.failures.len()
        );
        result
    }

    /// Summary of the archive structure
    pub fn get_info(&self) -> ArchiveInfo {
        ArchiveInfo {
            path: self.path.clone(),
            file_size: self.source_len,
            archive_offset: self.archive_offset,
            format_version: self.header.format_version,
            header_size: self.header.header_size,
            archive_size: self.header.get_archive_size(),
            sector_size: self.header.sector_size(),
            hash_table_size: self.hash_table.size(),
            block_table_size: self.block_table.size(),
            file_count: self
                .block_table
                .entries()
                .iter()
                .filter(|e| e.exists() && !e.is_delete_marker())
                .count(),
            has_hi_block_table: self.has_hi_block_table,
            has_listfile: self.contains(LISTFILE_NAME),
            user_data_info: self.user_data.as_ref().map(|ud| UserDataInfo {
                header_size: ud.user_data_header_size,
                data_size: ud.user_data_size,
                header_offset: ud.header_offset,
            }),
        }
    }
}

/// Name given to blocks the (listfile) does not name
pub fn synthetic_name(block_index: usize) -> String {
    format!("file_{block_index:08}.dat")
}

/// Detailed information about an MPQ archive
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// Path to the archive file, when opened from disk
    pub path: Option<PathBuf>,
    /// Total size of the byte source
    pub file_size: u64,
    /// Archive offset (non-zero when a user data header precedes it)
    pub archive_offset: u64,
    /// MPQ format version
    pub format_version: FormatVersion,
    /// Header size in bytes
    pub header_size: u32,
    /// Archive size recorded in the header
    pub archive_size: u64,
    /// Sector size in bytes
    pub sector_size: usize,
    /// Hash table size in slots
    pub hash_table_size: usize,
    /// Block table size in entries
    pub block_table_size: usize,
    /// Number of existing blocks
    pub file_count: usize,
    /// Whether a v2 hi-block table was merged
    pub has_hi_block_table: bool,
    /// Has (listfile) file
    pub has_listfile: bool,
    /// User data information
    pub user_data_info: Option<UserDataInfo>,
}

/// User data information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataInfo {
    /// Length of the user data content blob
    pub header_size: u32,
    /// Maximum user data size
    pub data_size: u32,
    /// Offset of the archive header relative to the user data header
    pub header_offset: u32,
}

/// Information about a resolved file
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// File name
    pub filename: String,
    /// Index in hash table
    pub hash_index: usize,
    /// Index in block table
    pub block_index: usize,
    /// Absolute file position in the byte source
    pub file_pos: u64,
    /// Compressed size
    pub compressed_size: u64,
    /// Uncompressed size
    pub file_size: u64,
    /// File flags
    pub flags: BlockFlags,
    /// File locale
    pub locale: u16,
}

impl FileInfo {
    /// Check if the file is compressed (either scheme)
    pub fn is_compressed(&self) -> bool {
        self.flags
            .intersects(BlockFlags::COMPRESS | BlockFlags::IMPLODE)
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// Check if the file has fixed key encryption
    pub fn has_fix_key(&self) -> bool {
        self.flags.contains(BlockFlags::FIX_KEY)
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags.contains(BlockFlags::SINGLE_UNIT)
    }

    /// Check if the file has sector CRCs
    pub fn has_sector_crc(&self) -> bool {
        self.flags.contains(BlockFlags::SECTOR_CRC)
    }

    /// Check if the file uses IMPLODE compression specifically
    pub fn is_imploded(&self) -> bool {
        self.flags.contains(BlockFlags::IMPLODE) && !self.flags.contains(BlockFlags::COMPRESS)
    }
}

/// Information about a file in the archive (for listing)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name
    pub name: String,
    /// Uncompressed size
    pub size: u64,
    /// Compressed size
    pub compressed_size: u64,
    /// File flags
    pub flags: BlockFlags,
    /// Locale of the resolved hash entry
    pub locale: u16,
    /// Index in block table
    pub block_index: usize,
}

impl FileEntry {
    /// Check if the file is compressed
    pub fn is_compressed(&self) -> bool {
        self.flags
            .intersects(BlockFlags::COMPRESS | BlockFlags::IMPLODE)
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// Space saved by compression, in percent of the uncompressed size
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.size == 0 {
            None
        } else {
            Some(100.0 - (self.compressed_size as f64 / self.size as f64 * 100.0))
        }
    }
}

/// Result of [`Archive::extract_all`]
#[derive(Debug, Default)]
pub struct ExtractAll {
    /// Decoded contents by member name
    pub files: BTreeMap<String, Vec<u8>>,
    /// Members that failed to decode
    pub failures: Vec<ExtractFailure>,
}

impl ExtractAll {
    /// Whether every member decoded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A member that could not be extracted
#[derive(Debug)]
pub struct ExtractFailure {
    /// Member name (real or synthetic)
    pub name: String,
    /// Block index, when the failure concerns a specific block
    pub block_index: Option<usize>,
    /// What went wrong
    pub error: Error,
}
