//! Sector decoder: turns a block's stored bytes into the file contents
//!
//! Files are stored in one of three layouts:
//!
//! - **single unit**: one (optionally compressed) chunk;
//! - **sectored, compressed**: a table of `count + 1` sector offsets
//!   (`count + 2` with sector checksums) followed by the sectors, each
//!   compressed on its own;
//! - **sectored, plain**: the raw bytes, split into sectors only for
//!   encryption.
//!
//! Encryption is applied per sector with `key + index`; the offset table
//! uses `key - 1`.

use crate::compression::{decompress, decompress_imploded};
use crate::crypto::{decrypt_block, decrypt_bytes};
use crate::tables::BlockEntry;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};

/// A block together with what is known about its name
#[derive(Debug, Clone, Copy)]
pub struct StoredFile<'a> {
    /// Name used in messages (the real name or a synthetic one)
    pub name: &'a str,
    /// Block table entry
    pub entry: &'a BlockEntry,
    /// Decryption key, `None` when the name (and thus the key) is unknown
    pub key: Option<u32>,
}

/// Read and decode a file's data from the byte source.
///
/// `file_start` is the absolute position of the block.
pub fn read_file_data<R: Read + Seek>(
    reader: &mut R,
    file_start: u64,
    file: &StoredFile<'_>,
    sector_size: usize,
    verify_crc: bool,
) -> Result<Vec<u8>> {
    if file.entry.file_size == 0 {
        return Ok(Vec::new());
    }

    reader.seek(SeekFrom::Start(file_start))?;
    let mut raw = vec![0u8; file.entry.compressed_size as usize];
    reader
        .read_exact(&mut raw)
        .map_err(|e| Error::from_read(e, file.name))?;

    decode_file_data(raw, file, sector_size, verify_crc)
}

/// Decode the stored bytes of a block (exactly `compressed_size` bytes)
pub fn decode_file_data(
    raw: Vec<u8>,
    file: &StoredFile<'_>,
    sector_size: usize,
    verify_crc: bool,
) -> Result<Vec<u8>> {
    let entry = file.entry;
    if entry.file_size == 0 {
        return Ok(Vec::new());
    }

    let key = if entry.is_encrypted() {
        Some(file.key.ok_or_else(|| {
            Error::crypto(format!(
                "{} is encrypted and its name is unknown, so no key can be derived",
                file.name
            ))
        })?)
    } else {
        None
    };

    log::trace!(
        "Decoding {}: {} -> {} bytes, flags {:?}",
        file.name,
        entry.compressed_size,
        entry.file_size,
        entry.flags
    );

    if entry.is_single_unit() {
        decode_single_unit(raw, file, key)
    } else if entry.has_compression() {
        decode_compressed_sectors(&raw, file, key, sector_size, verify_crc)
    } else {
        decode_plain_sectors(raw, file, key, sector_size)
    }
}

fn decode_single_unit(mut raw: Vec<u8>, file: &StoredFile<'_>, key: Option<u32>) -> Result<Vec<u8>> {
    let entry = file.entry;
    let file_size = entry.file_size as usize;

    if let Some(key) = key {
        decrypt_bytes(&mut raw, key);
    }

    if entry.has_compression() && raw.len() < file_size {
        decode_sector(&raw, entry, file_size, file.name, 0)
    } else {
        if raw.len() < file_size {
            return Err(Error::corrupted(format!(
                "{} stores {} bytes for a {file_size} byte file",
                file.name,
                raw.len()
            )));
        }
        raw.truncate(file_size);
        Ok(raw)
    }
}

fn decode_plain_sectors(
    mut raw: Vec<u8>,
    file: &StoredFile<'_>,
    key: Option<u32>,
    sector_size: usize,
) -> Result<Vec<u8>> {
    let file_size = file.entry.file_size as usize;
    if raw.len() < file_size {
        return Err(Error::corrupted(format!(
            "{} stores {} bytes for a {file_size} byte file",
            file.name,
            raw.len()
        )));
    }
    raw.truncate(file_size);

    if let Some(key) = key {
        for (index, sector) in raw.chunks_mut(sector_size).enumerate() {
            decrypt_bytes(sector, key.wrapping_add(index as u32));
        }
    }

    Ok(raw)
}

fn decode_compressed_sectors(
    raw: &[u8],
    file: &StoredFile<'_>,
    key: Option<u32>,
    sector_size: usize,
    verify_crc: bool,
) -> Result<Vec<u8>> {
    let entry = file.entry;
    let file_size = entry.file_size as usize;
    let sector_count = file_size.div_ceil(sector_size);

    let offsets = read_sector_offsets(raw, file, key, sector_count)?;
    let checksums = if entry.has_sector_crc() && verify_crc {
        read_sector_checksums(raw, file, &offsets, sector_count)?
    } else {
        None
    };

    let mut output = Vec::with_capacity(file_size);
    for index in 0..sector_count {
        let start = offsets[index] as usize;
        let end = offsets[index + 1] as usize;
        let expected = sector_size.min(file_size - index * sector_size);

        let mut sector = raw[start..end].to_vec();
        if let Some(key) = key {
            decrypt_bytes(&mut sector, key.wrapping_add(index as u32));
        }

        if let Some(checksums) = &checksums {
            verify_sector_checksum(&sector, checksums[index], file.name, index)?;
        }

        if sector.len() < expected {
            output.extend(decode_sector(&sector, entry, expected, file.name, index)?);
        } else {
            output.extend_from_slice(&sector[..expected]);
        }
    }

    output.truncate(file_size);
    Ok(output)
}

/// Read, decrypt and validate the sector offset table
fn read_sector_offsets(
    raw: &[u8],
    file: &StoredFile<'_>,
    key: Option<u32>,
    sector_count: usize,
) -> Result<Vec<u32>> {
    let entry_count = sector_count + 1 + usize::from(file.entry.has_sector_crc());
    let table_len = entry_count * 4;
    if raw.len() < table_len {
        return Err(Error::corrupted(format!(
            "{}: sector offset table ({table_len} bytes) does not fit in {} stored bytes",
            file.name,
            raw.len()
        )));
    }

    let mut offsets = vec![0u32; entry_count];
    LittleEndian::read_u32_into(&raw[..table_len], &mut offsets);
    if let Some(key) = key {
        decrypt_block(&mut offsets, key.wrapping_sub(1));
    }

    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(Error::corrupted(format!(
            "{}: sector offsets are not monotonic",
            file.name
        )));
    }
    if let Some(&last) = offsets.last()
        && last as usize > raw.len()
    {
        return Err(Error::corrupted(format!(
            "{}: sector offset {last:#x} past the end of the block ({:#x})",
            file.name,
            raw.len()
        )));
    }

    log::trace!("{}: sector offsets {:?}", file.name, offsets);
    Ok(offsets)
}

/// Read the sector checksum table stored after the last sector.
///
/// Returns `None` when the table is absent (zero length).
fn read_sector_checksums(
    raw: &[u8],
    file: &StoredFile<'_>,
    offsets: &[u32],
    sector_count: usize,
) -> Result<Option<Vec<u32>>> {
    let start = offsets[sector_count] as usize;
    let end = offsets[sector_count + 1] as usize;
    let table_len = sector_count * 4;

    let stored = &raw[start..end];
    if stored.is_empty() {
        return Ok(None);
    }

    let table = if stored.len() < table_len {
        decompress(&stored[1..], stored[0], table_len)?
    } else {
        stored[..table_len].to_vec()
    };

    let mut checksums = vec![0u32; sector_count];
    LittleEndian::read_u32_into(&table, &mut checksums);
    log::trace!("{}: sector checksums {:08X?}", file.name, checksums);
    Ok(Some(checksums))
}

/// Adler-32 (seeded with 0) of a stored sector, as used by sector checksums
pub fn sector_checksum(data: &[u8]) -> u32 {
    let mut adler = adler2::Adler32::from_checksum(0);
    adler.write_slice(data);
    adler.checksum()
}

fn verify_sector_checksum(sector: &[u8], expected: u32, name: &str, index: usize) -> Result<()> {
    // A zero checksum means the sector was stored without one.
    if expected == 0 {
        return Ok(());
    }

    let actual = sector_checksum(sector);
    if actual != expected {
        return Err(Error::ChecksumMismatch {
            file: format!("{name} (sector {index})"),
            expected,
            actual,
        });
    }
    Ok(())
}

fn decode_sector(
    sector: &[u8],
    entry: &BlockEntry,
    expected: usize,
    name: &str,
    index: usize,
) -> Result<Vec<u8>> {
    let decoded = if entry.is_imploded() {
        decompress_imploded(sector, expected)
    } else {
        match sector.split_first() {
            Some((&method, payload)) => decompress(payload, method, expected),
            None => Err(Error::compression("empty sector")),
        }
    };

    decoded.map_err(|e| match e {
        Error::Compression(msg) => Error::Compression(format!("{name} (sector {index}): {msg}")),
        other => other,
    })
}
