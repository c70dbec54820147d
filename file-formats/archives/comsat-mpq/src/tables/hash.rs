//! Hash table implementation for MPQ archives

use super::common::read_encrypted_table;
use crate::crypto::{calculate_mpq_hashes, decrypt_bytes, hash_string, hash_type};
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek};

/// State of a hash table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashSlot {
    /// Never used; terminates a probe
    Empty,
    /// Tombstone left by a deleted file; a probe continues past it
    Deleted,
    /// Refers to the given block table index
    Occupied(u32),
}

impl HashSlot {
    /// On-disk value of a never used slot
    pub const RAW_EMPTY: u32 = 0xFFFF_FFFF;
    /// On-disk value of a deleted slot
    pub const RAW_DELETED: u32 = 0xFFFF_FFFE;

    /// Decode the on-disk block index field
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::RAW_EMPTY => HashSlot::Empty,
            Self::RAW_DELETED => HashSlot::Deleted,
            index => HashSlot::Occupied(index),
        }
    }

    /// Encode back into the on-disk block index field
    pub fn to_raw(self) -> u32 {
        match self {
            HashSlot::Empty => Self::RAW_EMPTY,
            HashSlot::Deleted => Self::RAW_DELETED,
            HashSlot::Occupied(index) => index,
        }
    }

    /// Block index of an occupied slot
    pub fn block_index(self) -> Option<u32> {
        match self {
            HashSlot::Occupied(index) => Some(index),
            _ => None,
        }
    }
}

/// Hash table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry {
    /// The hash of the full file name (part A)
    pub name_1: u32,
    /// The hash of the full file name (part B)
    pub name_2: u32,
    /// The language of the file (Windows LANGID, 0 = neutral)
    pub locale: u16,
    /// The platform the file is used for (always 0 in practice)
    pub platform: u16,
    /// Slot state and block table index
    pub slot: HashSlot,
}

impl HashEntry {
    /// Create an empty hash entry
    pub fn empty() -> Self {
        Self {
            name_1: 0xFFFF_FFFF,
            name_2: 0xFFFF_FFFF,
            locale: 0xFFFF,
            platform: 0xFFFF,
            slot: HashSlot::Empty,
        }
    }

    /// Create an occupied entry for `filename`
    pub fn for_file(filename: &str, locale: u16, block_index: u32) -> Self {
        let (_, name_1, name_2) = calculate_mpq_hashes(filename);
        Self {
            name_1,
            name_2,
            locale,
            platform: 0,
            slot: HashSlot::Occupied(block_index),
        }
    }

    /// Check if this entry has never been used
    pub fn is_empty(&self) -> bool {
        self.slot == HashSlot::Empty
    }

    /// Check if this entry was deleted
    pub fn is_deleted(&self) -> bool {
        self.slot == HashSlot::Deleted
    }

    /// Check if this entry refers to a block
    pub fn is_occupied(&self) -> bool {
        matches!(self.slot, HashSlot::Occupied(_))
    }

    /// Read a hash entry from decrypted bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < super::TABLE_ENTRY_SIZE {
            return Err(Error::hash_table("Hash entry too small"));
        }

        Ok(Self {
            name_1: LittleEndian::read_u32(&data[0..4]),
            name_2: LittleEndian::read_u32(&data[4..8]),
            locale: LittleEndian::read_u16(&data[8..10]),
            platform: LittleEndian::read_u16(&data[10..12]),
            slot: HashSlot::from_raw(LittleEndian::read_u32(&data[12..16])),
        })
    }

    /// Serialize to the (unencrypted) on-disk layout
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        LittleEndian::write_u32(&mut out[0..4], self.name_1);
        LittleEndian::write_u32(&mut out[4..8], self.name_2);
        LittleEndian::write_u16(&mut out[8..10], self.locale);
        LittleEndian::write_u16(&mut out[10..12], self.platform);
        LittleEndian::write_u32(&mut out[12..16], self.slot.to_raw());
        out
    }
}

/// Hash table
#[derive(Debug, Clone)]
pub struct HashTable {
    entries: Vec<HashEntry>,
    mask: usize,
}

impl HashTable {
    /// Read and decrypt a hash table from the archive
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        validate_size(size)?;
        let raw_data = read_encrypted_table(reader, offset, size, "(hash table)")?;
        Self::parse(&raw_data, size)
    }

    /// Create a hash table from encrypted on-disk bytes
    pub fn from_bytes(data: &[u8], size: u32) -> Result<Self> {
        validate_size(size)?;

        let expected_size = size as usize * super::TABLE_ENTRY_SIZE;
        if data.len() < expected_size {
            return Err(Error::hash_table("Insufficient data for hash table"));
        }

        let mut raw_data = data[..expected_size].to_vec();
        decrypt_bytes(
            &mut raw_data,
            hash_string("(hash table)", hash_type::FILE_KEY),
        );
        Self::parse(&raw_data, size)
    }

    fn parse(raw_data: &[u8], size: u32) -> Result<Self> {
        let entries = raw_data
            .chunks_exact(super::TABLE_ENTRY_SIZE)
            .map(HashEntry::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Hash table: {} slots, {} occupied",
            entries.len(),
            entries.iter().filter(|e| e.is_occupied()).count()
        );

        Ok(Self {
            entries,
            mask: size as usize - 1,
        })
    }

    /// Get all entries
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&HashEntry> {
        self.entries.get(index)
    }

    /// Get the size of the hash table
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Find a file in the hash table.
    ///
    /// Probes linearly from the slot selected by the offset hash. Deleted
    /// slots are skipped, an empty slot or a full cycle ends the search.
    /// Among entries matching both name hashes an exact `locale` match wins,
    /// then the neutral locale, then the first match of any locale.
    pub fn find_file(&self, filename: &str, locale: u16) -> Option<(usize, &HashEntry)> {
        let (start, name_a, name_b) = calculate_mpq_hashes(filename);
        let start_index = start as usize & self.mask;

        let mut neutral = None;
        let mut any = None;

        for step in 0..self.entries.len() {
            let index = (start_index + step) & self.mask;
            let entry = &self.entries[index];

            match entry.slot {
                HashSlot::Empty => break,
                HashSlot::Deleted => continue,
                HashSlot::Occupied(_) => {}
            }

            if entry.name_1 != name_a || entry.name_2 != name_b {
                continue;
            }

            if entry.locale == locale {
                return Some((index, entry));
            }
            if entry.locale == 0 && neutral.is_none() {
                neutral = Some((index, entry));
            }
            if any.is_none() {
                any = Some((index, entry));
            }
        }

        neutral.or(any)
    }
}

fn validate_size(size: u32) -> Result<()> {
    if crate::is_power_of_two(size) {
        Ok(())
    } else {
        Err(Error::hash_table(format!(
            "Hash table size {size} is not a power of 2"
        )))
    }
}
