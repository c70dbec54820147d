//! Shared helpers for reading the encrypted tables

use crate::crypto::{decrypt_bytes, hash_string, hash_type};
use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Read `entries` 16-byte entries at `offset` and decrypt them with the key
/// derived from `key_name` (`"(hash table)"` or `"(block table)"`).
pub(crate) fn read_encrypted_table<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    entries: u32,
    key_name: &str,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut raw_data = vec![0u8; entries as usize * super::TABLE_ENTRY_SIZE];
    reader
        .read_exact(&mut raw_data)
        .map_err(|e| Error::from_read(e, key_name))?;

    decrypt_bytes(&mut raw_data, hash_string(key_name, hash_type::FILE_KEY));
    Ok(raw_data)
}
