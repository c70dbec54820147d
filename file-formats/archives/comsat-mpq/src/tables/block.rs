//! Block table implementation for MPQ archives

use super::common::read_encrypted_table;
use crate::crypto::{decrypt_bytes, hash_string, hash_type};
use crate::{Error, Result};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};

bitflags! {
    /// Flags of a block table entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u32 {
        /// File is compressed using PKWARE Data Compression Library
        const IMPLODE = 0x0000_0100;
        /// File is compressed using one or more compression methods
        const COMPRESS = 0x0000_0200;
        /// File is encrypted
        const ENCRYPTED = 0x0001_0000;
        /// The decryption key for the file is adjusted by the block position
        const FIX_KEY = 0x0002_0000;
        /// File is a patch file
        const PATCH_FILE = 0x0010_0000;
        /// File is stored as a single unit, rather than split into sectors
        const SINGLE_UNIT = 0x0100_0000;
        /// File is a deletion marker
        const DELETE_MARKER = 0x0200_0000;
        /// File has checksums for each sector
        const SECTOR_CRC = 0x0400_0000;
        /// File exists
        const EXISTS = 0x8000_0000;
    }
}

/// Block table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the beginning of the file data, relative to the archive
    pub file_pos: u32,
    /// High 16 bits of the file offset (v2 hi-block table)
    pub file_pos_hi: u16,
    /// Compressed file size
    pub compressed_size: u32,
    /// Uncompressed file size
    pub file_size: u32,
    /// Flags for the file
    pub flags: BlockFlags,
}

impl BlockEntry {
    /// Full file offset relative to the archive start
    pub fn offset(&self) -> u64 {
        ((self.file_pos_hi as u64) << 32) | self.file_pos as u64
    }

    /// Check if the file is compressed with the multi-method byte scheme
    pub fn is_compressed(&self) -> bool {
        self.flags.contains(BlockFlags::COMPRESS)
    }

    /// Check if the file is PKWARE imploded (no method byte)
    pub fn is_imploded(&self) -> bool {
        self.flags.contains(BlockFlags::IMPLODE)
    }

    /// Check if either compression flag is set
    pub fn has_compression(&self) -> bool {
        self.flags
            .intersects(BlockFlags::COMPRESS | BlockFlags::IMPLODE)
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags.contains(BlockFlags::SINGLE_UNIT)
    }

    /// Check if the file has sector CRCs
    pub fn has_sector_crc(&self) -> bool {
        self.flags.contains(BlockFlags::SECTOR_CRC)
    }

    /// Check if the file exists
    pub fn exists(&self) -> bool {
        self.flags.contains(BlockFlags::EXISTS)
    }

    /// Check if the file uses fixed key encryption
    pub fn has_fix_key(&self) -> bool {
        self.flags.contains(BlockFlags::FIX_KEY)
    }

    /// Check if the entry is a deletion marker
    pub fn is_delete_marker(&self) -> bool {
        self.flags.contains(BlockFlags::DELETE_MARKER)
    }

    /// Check if the file is a patch file
    pub fn is_patch_file(&self) -> bool {
        self.flags.contains(BlockFlags::PATCH_FILE)
    }

    /// Read a block entry from decrypted bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < super::TABLE_ENTRY_SIZE {
            return Err(Error::block_table("Block entry too small"));
        }

        Ok(Self {
            file_pos: LittleEndian::read_u32(&data[0..4]),
            file_pos_hi: 0,
            compressed_size: LittleEndian::read_u32(&data[4..8]),
            file_size: LittleEndian::read_u32(&data[8..12]),
            flags: BlockFlags::from_bits_retain(LittleEndian::read_u32(&data[12..16])),
        })
    }

    /// Serialize to the (unencrypted) on-disk layout
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        LittleEndian::write_u32(&mut out[0..4], self.file_pos);
        LittleEndian::write_u32(&mut out[4..8], self.compressed_size);
        LittleEndian::write_u32(&mut out[8..12], self.file_size);
        LittleEndian::write_u32(&mut out[12..16], self.flags.bits());
        out
    }
}

/// Block table
#[derive(Debug, Clone)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Read and decrypt a block table from the archive
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        let raw_data = read_encrypted_table(reader, offset, size, "(block table)")?;
        Self::parse(&raw_data)
    }

    /// Create a block table from encrypted on-disk bytes
    pub fn from_bytes(data: &[u8], size: u32) -> Result<Self> {
        let expected_size = size as usize * super::TABLE_ENTRY_SIZE;
        if data.len() < expected_size {
            return Err(Error::block_table("Insufficient data for block table"));
        }

        let mut raw_data = data[..expected_size].to_vec();
        decrypt_bytes(
            &mut raw_data,
            hash_string("(block table)", hash_type::FILE_KEY),
        );
        Self::parse(&raw_data)
    }

    fn parse(raw_data: &[u8]) -> Result<Self> {
        let entries = raw_data
            .chunks_exact(super::TABLE_ENTRY_SIZE)
            .map(BlockEntry::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Block table: {} entries, {} existing",
            entries.len(),
            entries.iter().filter(|e| e.exists()).count()
        );

        Ok(Self { entries })
    }

    /// Merge the high offset words of a v2 hi-block table
    pub fn apply_hi_block_table(&mut self, hi: &HiBlockTable) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.file_pos_hi = hi.get(index).unwrap_or(0);
        }
    }

    /// Get all entries
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&BlockEntry> {
        self.entries.get(index)
    }

    /// Get the size of the block table
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

/// Hi-block table (v2+): the upper 16 bits of every block offset, stored
/// unencrypted
#[derive(Debug, Clone)]
pub struct HiBlockTable {
    entries: Vec<u16>,
}

impl HiBlockTable {
    /// Read the hi-block table
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;

        let mut raw_data = vec![0u8; size as usize * 2];
        reader
            .read_exact(&mut raw_data)
            .map_err(|e| Error::from_read(e, "hi-block table"))?;

        let mut entries = vec![0u16; size as usize];
        LittleEndian::read_u16_into(&raw_data, &mut entries);
        Ok(Self { entries })
    }

    /// Get the high word for a block index
    pub fn get(&self, index: usize) -> Option<u16> {
        self.entries.get(index).copied()
    }
}
