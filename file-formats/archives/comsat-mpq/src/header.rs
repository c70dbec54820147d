//! MPQ header structures and parsing

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// MPQ archive header signature ('MPQ\x1A')
pub const MPQ_HEADER_SIGNATURE: u32 = 0x1A51_504D;

/// MPQ user data header signature ('MPQ\x1B')
pub const MPQ_USERDATA_SIGNATURE: u32 = 0x1B51_504D;

/// Header alignment requirement (512 bytes)
pub const HEADER_ALIGNMENT: u64 = 0x200;

/// Size of the fixed part of the user data header
pub const USER_DATA_HEADER_SIZE: u32 = 16;

/// Largest supported sector size shift (512 << 23 = 4 GiB)
const MAX_SECTOR_SHIFT: u16 = 23;

/// MPQ format version
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    /// Version 1 - Original format (32-byte header)
    V1 = 0,
    /// Version 2 - Burning Crusade (44-byte header)
    V2 = 1,
    /// Version 3 - Cataclysm Beta (68-byte header)
    V3 = 2,
    /// Version 4 - Cataclysm+ (208-byte header)
    V4 = 3,
}

impl FormatVersion {
    /// Get the header size for this version
    pub fn header_size(&self) -> u32 {
        match self {
            FormatVersion::V1 => 0x20,
            FormatVersion::V2 => 0x2C,
            FormatVersion::V3 => 0x44,
            FormatVersion::V4 => 0xD0,
        }
    }

    /// Create from raw version number
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(FormatVersion::V1),
            1 => Some(FormatVersion::V2),
            2 => Some(FormatVersion::V3),
            3 => Some(FormatVersion::V4),
            _ => None,
        }
    }

    /// Human readable version number (1-4)
    pub fn number(&self) -> u16 {
        *self as u16 + 1
    }
}

/// MPQ user data header (optional, appears before the archive header)
///
/// StarCraft II replays keep their replay header here; maps usually leave
/// it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataHeader {
    /// Maximum size of the user data
    pub user_data_size: u32,
    /// Offset of the MPQ header, relative to the beginning of this header
    pub header_offset: u32,
    /// Length of the content blob following the 16-byte header
    pub user_data_header_size: u32,
    /// Opaque content blob
    pub content: Vec<u8>,
}

/// Main MPQ header structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpqHeader {
    /// Size of the archive header
    pub header_size: u32,
    /// Size of MPQ archive (deprecated in v2+)
    pub archive_size: u32,
    /// Format version
    pub format_version: FormatVersion,
    /// Sector size shift
    pub block_size: u16,
    /// Offset to the hash table
    pub hash_table_pos: u32,
    /// Offset to the block table
    pub block_table_pos: u32,
    /// Number of entries in the hash table
    pub hash_table_size: u32,
    /// Number of entries in the block table
    pub block_table_size: u32,

    // Version 2+ fields
    /// Extended block table position
    pub hi_block_table_pos: Option<u64>,
    /// High 16 bits of hash table offset
    pub hash_table_pos_hi: Option<u16>,
    /// High 16 bits of block table offset
    pub block_table_pos_hi: Option<u16>,

    // Version 3+ fields
    /// 64-bit archive size
    pub archive_size_64: Option<u64>,
    /// Position of BET table (not used for lookups)
    pub bet_table_pos: Option<u64>,
    /// Position of HET table (not used for lookups)
    pub het_table_pos: Option<u64>,
}

impl MpqHeader {
    /// Read an MPQ header at the reader's current position
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut fixed = [0u8; 0x20];
        reader
            .read_exact(&mut fixed)
            .map_err(|e| Error::from_read(e, "archive header"))?;
        let mut cursor = Cursor::new(&fixed[..]);

        let signature = cursor.read_u32::<LittleEndian>()?;
        if signature != MPQ_HEADER_SIGNATURE {
            return Err(Error::invalid_format("Invalid MPQ header signature"));
        }

        let header_size = cursor.read_u32::<LittleEndian>()?;
        let archive_size = cursor.read_u32::<LittleEndian>()?;
        let format_version_raw = cursor.read_u16::<LittleEndian>()?;
        let block_size = cursor.read_u16::<LittleEndian>()?;
        let hash_table_pos = cursor.read_u32::<LittleEndian>()?;
        let block_table_pos = cursor.read_u32::<LittleEndian>()?;
        let hash_table_size = cursor.read_u32::<LittleEndian>()?;
        let block_table_size = cursor.read_u32::<LittleEndian>()?;

        let format_version = FormatVersion::from_raw(format_version_raw)
            .ok_or(Error::UnsupportedVersion(format_version_raw))?;

        if header_size < format_version.header_size() {
            return Err(Error::invalid_format(format!(
                "Header size {header_size} too small for version {format_version:?}"
            )));
        }

        if block_size > MAX_SECTOR_SHIFT {
            return Err(Error::invalid_format(format!(
                "Sector size shift {block_size} out of range"
            )));
        }

        let mut header = MpqHeader {
            header_size,
            archive_size,
            format_version,
            block_size,
            hash_table_pos,
            block_table_pos,
            hash_table_size,
            block_table_size,
            hi_block_table_pos: None,
            hash_table_pos_hi: None,
            block_table_pos_hi: None,
            archive_size_64: None,
            bet_table_pos: None,
            het_table_pos: None,
        };

        if format_version >= FormatVersion::V2 {
            let mut extended = [0u8; 12];
            reader
                .read_exact(&mut extended)
                .map_err(|e| Error::from_read(e, "v2 header fields"))?;
            let mut cursor = Cursor::new(&extended[..]);
            header.hi_block_table_pos = Some(cursor.read_u64::<LittleEndian>()?);
            header.hash_table_pos_hi = Some(cursor.read_u16::<LittleEndian>()?);
            header.block_table_pos_hi = Some(cursor.read_u16::<LittleEndian>()?);
        }

        if format_version >= FormatVersion::V3 {
            let mut extended = [0u8; 24];
            reader
                .read_exact(&mut extended)
                .map_err(|e| Error::from_read(e, "v3 header fields"))?;
            let mut cursor = Cursor::new(&extended[..]);
            header.archive_size_64 = Some(cursor.read_u64::<LittleEndian>()?);
            header.bet_table_pos = Some(cursor.read_u64::<LittleEndian>()?);
            header.het_table_pos = Some(cursor.read_u64::<LittleEndian>()?);
        }

        Ok(header)
    }

    /// Get the actual archive size (using 64-bit value if available)
    pub fn get_archive_size(&self) -> u64 {
        self.archive_size_64.unwrap_or(self.archive_size as u64)
    }

    /// Get the full hash table position
    pub fn get_hash_table_pos(&self) -> u64 {
        if let Some(hi) = self.hash_table_pos_hi {
            ((hi as u64) << 32) | (self.hash_table_pos as u64)
        } else {
            self.hash_table_pos as u64
        }
    }

    /// Get the full block table position
    pub fn get_block_table_pos(&self) -> u64 {
        if let Some(hi) = self.block_table_pos_hi {
            ((hi as u64) << 32) | (self.block_table_pos as u64)
        } else {
            self.block_table_pos as u64
        }
    }

    /// Calculate the sector size from block size
    pub fn sector_size(&self) -> usize {
        crate::calculate_sector_size(self.block_size)
    }

    /// Hi-block table position, when the header declares one
    pub fn get_hi_block_table_pos(&self) -> Option<u64> {
        self.hi_block_table_pos.filter(|&pos| pos != 0)
    }

    /// Check that every table lies inside a byte source of `source_len` bytes
    pub fn validate_table_bounds(&self, archive_offset: u64, source_len: u64) -> Result<()> {
        let mut tables = vec![
            (
                "hash table",
                self.get_hash_table_pos(),
                self.hash_table_size as u64 * 16,
            ),
            (
                "block table",
                self.get_block_table_pos(),
                self.block_table_size as u64 * 16,
            ),
        ];
        if let Some(pos) = self.get_hi_block_table_pos() {
            tables.push(("hi-block table", pos, self.block_table_size as u64 * 2));
        }

        for (name, pos, len) in tables {
            let end = table_offset(archive_offset, pos)?
                .checked_add(len)
                .ok_or_else(|| Error::invalid_format(format!("{name} size overflows")))?;
            if end > source_len {
                return Err(Error::truncated(format!(
                    "{name} ends at {end:#x}, past the end of the archive ({source_len:#x})"
                )));
            }
        }

        Ok(())
    }
}

/// Absolute position of a table stored `pos` bytes into the archive
pub fn table_offset(archive_offset: u64, pos: u64) -> Result<u64> {
    archive_offset.checked_add(pos).ok_or_else(|| {
        Error::invalid_format(format!(
            "table position {pos:#x} overflows from archive offset {archive_offset:#x}"
        ))
    })
}

impl UserDataHeader {
    /// Read the user data header following an already consumed signature.
    ///
    /// `start` is the position of the signature; the content blob is read
    /// from `start + 16`.
    fn read_after_signature<R: Read + Seek>(reader: &mut R, start: u64) -> Result<Self> {
        let mut fields = [0u8; 12];
        reader
            .read_exact(&mut fields)
            .map_err(|e| Error::from_read(e, "user data header"))?;
        let mut cursor = Cursor::new(&fields[..]);

        let user_data_size = cursor.read_u32::<LittleEndian>()?;
        let header_offset = cursor.read_u32::<LittleEndian>()?;
        let user_data_header_size = cursor.read_u32::<LittleEndian>()?;

        reader.seek(SeekFrom::Start(start + USER_DATA_HEADER_SIZE as u64))?;
        let mut content = Vec::new();
        reader
            .by_ref()
            .take(user_data_header_size as u64)
            .read_to_end(&mut content)?;
        if content.len() != user_data_header_size as usize {
            return Err(Error::truncated(format!(
                "user data content declares {user_data_header_size} bytes, {} available",
                content.len()
            )));
        }

        Ok(UserDataHeader {
            user_data_size,
            header_offset,
            user_data_header_size,
            content,
        })
    }
}

/// Find the MPQ header in a byte source.
///
/// Candidate offsets are the multiples of [`HEADER_ALIGNMENT`] below
/// `search_limit` (clamped to the source length). Returns the absolute
/// archive offset, the user data header if one introduced the archive, and
/// the archive header.
pub fn find_header<R: Read + Seek>(
    reader: &mut R,
    search_limit: u64,
) -> Result<(u64, Option<UserDataHeader>, MpqHeader)> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let limit = search_limit.min(file_size);
    let mut offset = 0u64;

    while offset < limit {
        reader.seek(SeekFrom::Start(offset))?;

        let signature = match reader.read_u32::<LittleEndian>() {
            Ok(sig) => sig,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        match signature {
            MPQ_HEADER_SIGNATURE => {
                log::debug!("Found MPQ header at offset {offset:#x}");
                reader.seek(SeekFrom::Start(offset))?;
                let header = MpqHeader::read(reader)?;
                return Ok((offset, None, header));
            }
            MPQ_USERDATA_SIGNATURE => {
                let user_data = match UserDataHeader::read_after_signature(reader, offset) {
                    Ok(user_data) => user_data,
                    Err(Error::Truncated(reason)) => {
                        log::debug!("Skipping user data header at {offset:#x}: {reason}");
                        offset += HEADER_ALIGNMENT;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let mpq_offset = offset + user_data.header_offset as u64;
                log::debug!(
                    "Found user data header at offset {offset:#x}, archive header expected at {mpq_offset:#x}"
                );

                if mpq_offset < file_size {
                    reader.seek(SeekFrom::Start(mpq_offset))?;
                    let mpq_sig = reader
                        .read_u32::<LittleEndian>()
                        .map_err(|e| Error::from_read(e, "archive header"))?;
                    if mpq_sig == MPQ_HEADER_SIGNATURE {
                        reader.seek(SeekFrom::Start(mpq_offset))?;
                        let header = MpqHeader::read(reader)?;
                        return Ok((mpq_offset, Some(user_data), header));
                    }
                }

                log::debug!("User data header at {offset:#x} does not lead to an archive header");
            }
            _ => {}
        }

        offset += HEADER_ALIGNMENT;
    }

    Err(Error::invalid_format(format!(
        "No MPQ header found in the first {limit} bytes"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn v1_header(hash_pos: u32, block_pos: u32, hash_size: u32, block_size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(MPQ_HEADER_SIGNATURE).unwrap();
        buf.write_u32::<LittleEndian>(0x20).unwrap();
        buf.write_u32::<LittleEndian>(0x1000).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap();
        buf.write_u16::<LittleEndian>(3).unwrap();
        buf.write_u32::<LittleEndian>(hash_pos).unwrap();
        buf.write_u32::<LittleEndian>(block_pos).unwrap();
        buf.write_u32::<LittleEndian>(hash_size).unwrap();
        buf.write_u32::<LittleEndian>(block_size).unwrap();
        buf
    }

    #[test]
    fn test_read_v1_header() {
        let data = v1_header(0x20, 0x120, 16, 4);
        let header = MpqHeader::read(&mut Cursor::new(data)).unwrap();

        assert_eq!(header.format_version, FormatVersion::V1);
        assert_eq!(header.header_size, 0x20);
        assert_eq!(header.hash_table_size, 16);
        assert_eq!(header.block_table_size, 4);
        assert_eq!(header.sector_size(), 4096);
        assert_eq!(header.get_hash_table_pos(), 0x20);
        assert!(header.hi_block_table_pos.is_none());
    }

    #[test]
    fn test_read_v2_header_high_words() {
        let mut data = v1_header(0x20, 0x120, 16, 4);
        data[4..8].copy_from_slice(&0x2Cu32.to_le_bytes());
        data[12..14].copy_from_slice(&1u16.to_le_bytes());
        data.write_u64::<LittleEndian>(0).unwrap();
        data.write_u16::<LittleEndian>(1).unwrap();
        data.write_u16::<LittleEndian>(2).unwrap();

        let header = MpqHeader::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.format_version, FormatVersion::V2);
        assert_eq!(header.get_hash_table_pos(), 0x1_0000_0020);
        assert_eq!(header.get_block_table_pos(), 0x2_0000_0120);
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = v1_header(0x20, 0x120, 16, 4);
        data[12..14].copy_from_slice(&7u16.to_le_bytes());
        assert!(matches!(
            MpqHeader::read(&mut Cursor::new(data)),
            Err(Error::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = v1_header(0x20, 0x120, 16, 4);
        assert!(matches!(
            MpqHeader::read(&mut Cursor::new(&data[..20])),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn test_find_header_at_aligned_offset() {
        let mut data = vec![0u8; 0x400];
        data.extend(v1_header(0x20, 0x120, 16, 4));
        data.resize(0x400 + 0x200, 0);

        let (offset, user_data, header) = find_header(&mut Cursor::new(data), u64::MAX).unwrap();
        assert_eq!(offset, 0x400);
        assert!(user_data.is_none());
        assert_eq!(header.block_table_size, 4);
    }

    #[test]
    fn test_find_header_through_user_data() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(MPQ_USERDATA_SIGNATURE).unwrap();
        data.write_u32::<LittleEndian>(0x200).unwrap();
        data.write_u32::<LittleEndian>(0x400).unwrap();
        data.write_u32::<LittleEndian>(5).unwrap();
        data.extend_from_slice(b"hello");
        data.resize(0x400, 0);
        data.extend(v1_header(0x20, 0x120, 16, 4));

        let (offset, user_data, _) = find_header(&mut Cursor::new(data), u64::MAX).unwrap();
        let user_data = user_data.unwrap();
        assert_eq!(offset, 0x400);
        assert_eq!(user_data.header_offset, 0x400);
        assert_eq!(user_data.content, b"hello");
    }

    #[test]
    fn test_find_header_not_found() {
        let data = vec![0u8; 0x1000];
        assert!(matches!(
            find_header(&mut Cursor::new(data), u64::MAX),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_find_header_respects_search_limit() {
        let mut data = vec![0u8; 0x800];
        data.extend(v1_header(0x20, 0x120, 16, 4));
        assert!(find_header(&mut Cursor::new(data.clone()), 0x800).is_err());
        assert!(find_header(&mut Cursor::new(data), 0x801).is_ok());
    }

    #[test]
    fn test_validate_table_bounds() {
        let data = v1_header(0x20, 0x120, 16, 4);
        let header = MpqHeader::read(&mut Cursor::new(data)).unwrap();

        assert!(header.validate_table_bounds(0, 0x160).is_ok());
        assert!(matches!(
            header.validate_table_bounds(0, 0x15F),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn test_truncated_user_data_is_skipped() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(MPQ_USERDATA_SIGNATURE).unwrap();
        data.write_u32::<LittleEndian>(0x200).unwrap();
        data.write_u32::<LittleEndian>(0x200).unwrap();
        // Content longer than the whole source
        data.write_u32::<LittleEndian>(0x10000).unwrap();
        data.resize(0x200, 0);
        data.extend(v1_header(0x20, 0x120, 16, 4));

        let (offset, user_data, _) = find_header(&mut Cursor::new(data.clone()), u64::MAX).unwrap();
        assert_eq!(offset, 0x200);
        assert!(user_data.is_none());

        data.truncate(0x200);
        assert!(matches!(
            find_header(&mut Cursor::new(data), u64::MAX),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_validate_hi_block_table_bounds() {
        let mut data = v1_header(0x20, 0x120, 16, 4);
        data[4..8].copy_from_slice(&0x2Cu32.to_le_bytes());
        data[12..14].copy_from_slice(&1u16.to_le_bytes());
        data.write_u64::<LittleEndian>(0x160).unwrap();
        data.write_u32::<LittleEndian>(0).unwrap();
        let header = MpqHeader::read(&mut Cursor::new(data)).unwrap();

        // 4 blocks need 8 bytes of high words
        assert!(header.validate_table_bounds(0, 0x168).is_ok());
        assert!(matches!(
            header.validate_table_bounds(0, 0x167),
            Err(Error::Truncated(_))
        ));
        assert!(matches!(
            header.validate_table_bounds(u64::MAX - 0x100, u64::MAX),
            Err(Error::InvalidFormat(_))
        ));
    }
}
