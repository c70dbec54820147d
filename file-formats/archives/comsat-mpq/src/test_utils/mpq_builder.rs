//! Synthetic MPQ archive writer
//!
//! Produces small v1 archives exercising the reader: user data headers,
//! every supported codec, encryption with and without FIX_KEY, sector
//! checksums, tombstoned hash slots, unlisted and removed blocks.

use crate::compression::{compress, flags, implode};
use crate::crypto::{encrypt_block, encrypt_bytes, file_key, hash_string, hash_type};
use crate::header::{MPQ_HEADER_SIGNATURE, MPQ_USERDATA_SIGNATURE, USER_DATA_HEADER_SIZE};
use crate::sector::sector_checksum;
use crate::special_files::LISTFILE_NAME;
use crate::tables::{BlockEntry, BlockFlags, HashEntry, HashSlot};
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs;
use std::path::{Path, PathBuf};

/// How a single file is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Method byte for per-sector compression (COMPRESS flag)
    pub compression: Option<u8>,
    /// PKWare DCL without a method byte (IMPLODE flag)
    pub implode: bool,
    /// Encrypt the file
    pub encrypted: bool,
    /// Adjust the key by block position and size
    pub fix_key: bool,
    /// Store as one unit instead of sectors
    pub single_unit: bool,
    /// Append per-sector checksums (compressed, sectored files only)
    pub sector_crc: bool,
}

impl FileOptions {
    /// Sectored file compressed with `method`
    pub fn compressed(method: u8) -> Self {
        Self {
            compression: Some(method),
            ..Self::default()
        }
    }

    /// Sectored file with the IMPLODE flag
    pub fn imploded() -> Self {
        Self {
            implode: true,
            ..Self::default()
        }
    }

    /// Also encrypt
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Also encrypt, with the FIX_KEY adjustment
    pub fn with_fix_key(mut self) -> Self {
        self.encrypted = true;
        self.fix_key = true;
        self
    }

    /// Store as a single unit
    pub fn single_unit(mut self) -> Self {
        self.single_unit = true;
        self
    }

    /// Append sector checksums
    pub fn with_sector_crc(mut self) -> Self {
        self.sector_crc = true;
        self
    }

    fn is_packed(&self) -> bool {
        self.compression.is_some() || self.implode
    }
}

/// A file to include in the test archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// Path/name of the file within the archive
    pub name: String,
    /// File content data
    pub data: Vec<u8>,
    /// Storage options
    pub options: FileOptions,
    /// Locale of the hash entry
    pub locale: u16,
    /// Whether the name appears in the generated (listfile)
    pub listed: bool,
    /// Put a deleted slot in front of this file's hash entry
    pub behind_tombstone: bool,
    /// Rewrite the first sector's method byte to an unsupported codec
    pub unreadable: bool,
}

impl TestFile {
    /// Plain stored file
    pub fn new(name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            data: data.into(),
            options: FileOptions::default(),
            locale: 0,
            listed: true,
            behind_tombstone: false,
            unreadable: false,
        }
    }

    /// Set the storage options
    pub fn with_options(mut self, options: FileOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the locale
    pub fn with_locale(mut self, locale: u16) -> Self {
        self.locale = locale;
        self
    }

    /// Leave the name out of the listfile
    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }

    /// Place a tombstone in the probe chain before this entry
    pub fn behind_tombstone(mut self) -> Self {
        self.behind_tombstone = true;
        self
    }

    /// Make the file fail to decode (needs a compressed, unencrypted file)
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

/// Serialized replay header of a 1.4.1.19776 replay lasting 14419 game loops
pub const SAMPLE_REPLAY_HEADER: &[u8] = b"\x05\x08\
    \x00\x02\x2CStarCraft II replay\x1b11\
    \x02\x05\x0C\x00\x09\x00\x02\x09\x02\x04\x09\x08\x06\x09\x02\x08\x09\x80\xB5\x02\x0A\x09\x80\xB5\x02\
    \x04\x09\x04\
    \x06\x09\xA6\xE1\x01";

/// Configuration for creating test MPQ archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArchiveConfig {
    /// File name of the archive
    pub name: String,
    /// Files in block table order
    pub files: Vec<TestFile>,
    /// Hash table size (if None, automatically determined)
    pub hash_table_size: Option<u32>,
    /// Sector size shift (sector size = 512 << block_size)
    pub block_size: u16,
    /// Whether to add a generated (listfile)
    pub include_listfile: bool,
    /// Additional listfile lines that name no stored file
    pub listfile_extra: Vec<String>,
    /// Content of a user data header placed before the archive
    pub user_data: Option<Vec<u8>>,
    /// Block table entries without the EXISTS flag appended at the end
    pub removed_blocks: u32,
}

impl TestArchiveConfig {
    /// Empty configuration
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
            hash_table_size: None,
            block_size: 3,
            include_listfile: true,
            listfile_extra: Vec::new(),
            user_data: None,
            removed_blocks: 0,
        }
    }

    /// Add a file
    pub fn with_file(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    /// Minimal archive with a single file
    pub fn minimal() -> Self {
        Self::new("minimal.mpq").with_file(TestFile::new("test.txt", b"Hello, MPQ!".to_vec()))
    }

    /// A replay-like archive: user data header, encrypted and compressed
    /// replay members
    pub fn replay() -> Self {
        let mut config = Self::new("sample.SC2Replay");
        config.user_data = Some(SAMPLE_REPLAY_HEADER.to_vec());
        config
            .with_file(
                TestFile::new("replay.details", generate_compressible_data(3000))
                    .with_options(FileOptions::compressed(flags::BZIP2).encrypted()),
            )
            .with_file(
                TestFile::new("replay.initData", generate_compressible_data(9000))
                    .with_options(FileOptions::compressed(flags::ZLIB).with_sector_crc()),
            )
            .with_file(
                TestFile::new("replay.game.events", generate_binary_pattern(5000))
                    .with_options(FileOptions::compressed(flags::BZIP2).single_unit()),
            )
            .with_file(
                TestFile::new("replay.attributes.events", generate_binary_pattern(700))
                    .with_options(FileOptions::default().with_fix_key()),
            )
    }

    /// A map-like archive with a thumbnail and localized strings
    pub fn map() -> Self {
        Self::new("sample.SC2Map")
            .with_file(
                TestFile::new("Minimap.tga", generate_binary_pattern(4096))
                    .with_options(FileOptions::compressed(flags::ZLIB)),
            )
            .with_file(
                TestFile::new(
                    "enUS.SC2Data\\LocalizedData\\GameStrings.txt",
                    b"Map/Name=Lost Temple\r\n".to_vec(),
                )
                .with_options(FileOptions::compressed(flags::ZLIB)),
            )
            .with_file(
                TestFile::new(
                    "deDE.SC2Data\\LocalizedData\\GameStrings.txt",
                    b"Map/Name=Verlorener Tempel\r\n".to_vec(),
                )
                .with_options(FileOptions::compressed(flags::ZLIB)),
            )
            .with_file(
                TestFile::new(
                    "enUS.SC2Data\\LocalizedData\\TriggerStrings.txt",
                    b"Trigger/Name=Init\r\n".to_vec(),
                ),
            )
            .with_file(
                TestFile::new("MapScript.galaxy", generate_compressible_data(6000))
                    .with_options(FileOptions::compressed(flags::ZLIB).encrypted()),
            )
    }

    /// Every storage layout the reader understands
    pub fn comprehensive() -> Self {
        let mut config = Self::new("comprehensive.mpq");
        config.block_size = 0;
        config.listfile_extra = vec!["missing\\file.txt".to_string()];
        config.removed_blocks = 2;
        config
            .with_file(TestFile::new("empty.txt", Vec::new()))
            .with_file(TestFile::new("readme.txt", b"MPQ test archive\n".to_vec()))
            .with_file(
                TestFile::new("data\\zlib.dat", generate_compressible_data(2000))
                    .with_options(FileOptions::compressed(flags::ZLIB)),
            )
            .with_file(
                TestFile::new("data\\bzip2.dat", generate_compressible_data(1500))
                    .with_options(FileOptions::compressed(flags::BZIP2).encrypted()),
            )
            .with_file(
                TestFile::new("data\\lzma.dat", generate_compressible_data(1200))
                    .with_options(FileOptions::compressed(flags::LZMA)),
            )
            .with_file(
                TestFile::new("data\\sparse.dat", generate_sparse_data(1800))
                    .with_options(FileOptions::compressed(flags::SPARSE | flags::ZLIB)),
            )
            .with_file(
                TestFile::new("data\\implode.dat", generate_compressible_data(1100))
                    .with_options(FileOptions::imploded()),
            )
            .with_file(
                TestFile::new("secure\\fixed.bin", generate_binary_pattern(1300))
                    .with_options(FileOptions::compressed(flags::ZLIB).with_fix_key()),
            )
            .with_file(
                TestFile::new("secure\\plain.bin", generate_binary_pattern(1027))
                    .with_options(FileOptions::default().encrypted()),
            )
            .with_file(
                TestFile::new("crc\\checked.dat", generate_compressible_data(1600))
                    .with_options(FileOptions::compressed(flags::ZLIB).with_sector_crc()),
            )
            .with_file(TestFile::new("tombstone\\after.txt", b"found me".to_vec()).behind_tombstone())
            .with_file(TestFile::new("hidden.bin", generate_binary_pattern(300)).unlisted())
    }
}

/// Encode one file's stored bytes and block entry.
///
/// `file_pos` is the block position relative to the archive start; it only
/// matters for FIX_KEY.
pub fn encode_file_data(
    name: &str,
    data: &[u8],
    options: &FileOptions,
    file_pos: u32,
    sector_size: usize,
) -> Result<(Vec<u8>, BlockEntry)> {
    let file_size = u32::try_from(data.len())
        .map_err(|_| Error::invalid_format("test file larger than 4 GiB"))?;
    let key = file_key(name, file_pos, file_size, options.fix_key);

    let mut block_flags = BlockFlags::EXISTS;
    if options.compression.is_some() {
        block_flags |= BlockFlags::COMPRESS;
    }
    if options.implode {
        block_flags |= BlockFlags::IMPLODE;
    }
    if options.encrypted {
        block_flags |= BlockFlags::ENCRYPTED;
    }
    if options.fix_key {
        block_flags |= BlockFlags::FIX_KEY;
    }
    if options.single_unit {
        block_flags |= BlockFlags::SINGLE_UNIT;
    }

    let raw = if data.is_empty() {
        Vec::new()
    } else if options.single_unit {
        let mut payload = pack(data, options)?;
        if options.encrypted {
            encrypt_bytes(&mut payload, key);
        }
        payload
    } else if options.is_packed() {
        if options.sector_crc {
            block_flags |= BlockFlags::SECTOR_CRC;
        }
        encode_packed_sectors(data, options, key, sector_size)?
    } else {
        let mut raw = data.to_vec();
        if options.encrypted {
            for (index, sector) in raw.chunks_mut(sector_size).enumerate() {
                encrypt_bytes(sector, key.wrapping_add(index as u32));
            }
        }
        raw
    };

    let entry = BlockEntry {
        file_pos,
        file_pos_hi: 0,
        compressed_size: raw.len() as u32,
        file_size,
        flags: block_flags,
    };
    Ok((raw, entry))
}

fn pack(data: &[u8], options: &FileOptions) -> Result<Vec<u8>> {
    if let Some(method) = options.compression {
        compress(data, method)
    } else if options.implode {
        let imploded = implode(data)?;
        Ok(if imploded.len() < data.len() {
            imploded
        } else {
            data.to_vec()
        })
    } else {
        Ok(data.to_vec())
    }
}

fn encode_packed_sectors(
    data: &[u8],
    options: &FileOptions,
    key: u32,
    sector_size: usize,
) -> Result<Vec<u8>> {
    let sectors = data
        .chunks(sector_size)
        .map(|chunk| pack(chunk, options))
        .collect::<Result<Vec<_>>>()?;
    let count = sectors.len();
    let with_crc = options.sector_crc;

    let mut offsets = Vec::with_capacity(count + 2);
    let mut position = ((count + 1 + usize::from(with_crc)) * 4) as u32;
    for sector in &sectors {
        offsets.push(position);
        position += sector.len() as u32;
    }
    offsets.push(position);

    let checksums: Vec<u32> = sectors.iter().map(|s| sector_checksum(s)).collect();
    if with_crc {
        offsets.push(position + (checksums.len() * 4) as u32);
    }

    if options.encrypted {
        encrypt_block(&mut offsets, key.wrapping_sub(1));
    }

    let mut raw = vec![0u8; offsets.len() * 4];
    LittleEndian::write_u32_into(&offsets, &mut raw);

    for (index, mut sector) in sectors.into_iter().enumerate() {
        if options.encrypted {
            encrypt_bytes(&mut sector, key.wrapping_add(index as u32));
        }
        raw.extend_from_slice(&sector);
    }

    if with_crc {
        for checksum in checksums {
            raw.write_u32::<LittleEndian>(checksum)?;
        }
    }

    Ok(raw)
}

/// Point the first sector's method byte at the (unsupported) Huffman codec
fn make_unreadable(raw: &mut [u8], entry: &BlockEntry) -> Result<()> {
    if !entry.is_compressed() || entry.is_encrypted() || raw.len() < 4 {
        return Err(Error::invalid_format(
            "unreadable test files must be compressed and unencrypted",
        ));
    }

    let first = if entry.is_single_unit() {
        0
    } else {
        LittleEndian::read_u32(&raw[..4]) as usize
    };
    match raw.get_mut(first) {
        Some(method) => {
            *method = flags::HUFFMAN;
            Ok(())
        }
        None => Err(Error::invalid_format("unreadable test file has no sector data")),
    }
}

/// Build a test archive in memory
pub fn build_test_archive(config: &TestArchiveConfig) -> Result<Vec<u8>> {
    let sector_size = crate::calculate_sector_size(config.block_size);

    let mut out = Vec::new();
    let archive_offset = match &config.user_data {
        Some(content) => write_user_data(&mut out, content)?,
        None => 0,
    };
    out.resize(archive_offset + 0x20, 0);

    let mut listfile = config
        .files
        .iter()
        .filter(|f| f.listed)
        .map(|f| f.name.clone())
        .collect::<Vec<_>>();
    listfile.extend(config.listfile_extra.iter().cloned());
    listfile.push(LISTFILE_NAME.to_string());

    let mut files = config.files.clone();
    if config.include_listfile {
        files.push(TestFile::new(
            LISTFILE_NAME,
            listfile.join("\r\n").into_bytes(),
        ));
    }

    let mut blocks = Vec::with_capacity(files.len());
    for file in &files {
        let file_pos = (out.len() - archive_offset) as u32;
        let (mut raw, entry) =
            encode_file_data(&file.name, &file.data, &file.options, file_pos, sector_size)?;
        if file.unreadable {
            make_unreadable(&mut raw, &entry)?;
        }
        out.extend_from_slice(&raw);
        blocks.push(entry);
    }
    for _ in 0..config.removed_blocks {
        blocks.push(BlockEntry {
            file_pos: (out.len() - archive_offset) as u32,
            file_pos_hi: 0,
            compressed_size: 0,
            file_size: 0,
            flags: BlockFlags::empty(),
        });
    }

    let hash_table_size = config
        .hash_table_size
        .unwrap_or_else(|| ((files.len() as u32 + 1) * 2).next_power_of_two().max(16));
    let hash_table = build_hash_table(&files, hash_table_size)?;

    let hash_table_pos = (out.len() - archive_offset) as u32;
    let mut hash_bytes: Vec<u8> = hash_table.iter().flat_map(|e| e.to_bytes()).collect();
    encrypt_bytes(
        &mut hash_bytes,
        hash_string("(hash table)", hash_type::FILE_KEY),
    );
    out.extend_from_slice(&hash_bytes);

    let block_table_pos = (out.len() - archive_offset) as u32;
    let mut block_bytes: Vec<u8> = blocks.iter().flat_map(|e| e.to_bytes()).collect();
    encrypt_bytes(
        &mut block_bytes,
        hash_string("(block table)", hash_type::FILE_KEY),
    );
    out.extend_from_slice(&block_bytes);

    let mut header = Vec::with_capacity(0x20);
    header.write_u32::<LittleEndian>(MPQ_HEADER_SIGNATURE)?;
    header.write_u32::<LittleEndian>(0x20)?;
    header.write_u32::<LittleEndian>((out.len() - archive_offset) as u32)?;
    header.write_u16::<LittleEndian>(0)?;
    header.write_u16::<LittleEndian>(config.block_size)?;
    header.write_u32::<LittleEndian>(hash_table_pos)?;
    header.write_u32::<LittleEndian>(block_table_pos)?;
    header.write_u32::<LittleEndian>(hash_table_size)?;
    header.write_u32::<LittleEndian>(blocks.len() as u32)?;
    out[archive_offset..archive_offset + 0x20].copy_from_slice(&header);

    Ok(out)
}

fn write_user_data(out: &mut Vec<u8>, content: &[u8]) -> Result<usize> {
    let used = USER_DATA_HEADER_SIZE as usize + content.len();
    let header_offset = used.next_multiple_of(0x200);

    out.write_u32::<LittleEndian>(MPQ_USERDATA_SIGNATURE)?;
    out.write_u32::<LittleEndian>(header_offset as u32)?;
    out.write_u32::<LittleEndian>(header_offset as u32)?;
    out.write_u32::<LittleEndian>(content.len() as u32)?;
    out.extend_from_slice(content);
    out.resize(header_offset, 0);

    Ok(header_offset)
}

fn build_hash_table(files: &[TestFile], size: u32) -> Result<Vec<HashEntry>> {
    if !crate::is_power_of_two(size) || size as usize <= files.len() * 2 {
        return Err(Error::hash_table(format!(
            "test hash table of {size} slots cannot hold {} files",
            files.len()
        )));
    }

    let mask = size as usize - 1;
    let mut table = vec![HashEntry::empty(); size as usize];

    let next_empty = |table: &[HashEntry], name: &str| {
        let mut index = hash_string(name, hash_type::TABLE_OFFSET) as usize & mask;
        while !table[index].is_empty() {
            index = (index + 1) & mask;
        }
        index
    };

    for (block_index, file) in files.iter().enumerate() {
        if file.behind_tombstone {
            let index = next_empty(&table, &file.name);
            let mut tombstone = HashEntry::for_file("(deleted)", 0, 0);
            tombstone.slot = HashSlot::Deleted;
            table[index] = tombstone;
        }
        let index = next_empty(&table, &file.name);
        table[index] = HashEntry::for_file(&file.name, file.locale, block_index as u32);
    }

    Ok(table)
}

/// Write a test archive to `output_dir/<config.name>`
pub fn create_test_archive(output_dir: &Path, config: &TestArchiveConfig) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(&config.name);
    fs::write(&path, build_test_archive(config)?)?;
    Ok(path)
}

/// Generate compressible test data
pub fn generate_compressible_data(size: usize) -> Vec<u8> {
    let pattern = b"This is test data that should compress well because it has repeated patterns. ";
    pattern.iter().copied().cycle().take(size).collect()
}

/// Generate binary pattern data
pub fn generate_binary_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Mostly zero data with short islands of content
pub fn generate_sparse_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| if i % 200 < 8 { (i % 251) as u8 | 1 } else { 0 })
        .collect()
}
