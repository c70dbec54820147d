//! Hash algorithms for MPQ file name hashing

use super::keys::ENCRYPTION_TABLE;
use super::types::hash_type;

/// Hash a string using the MPQ hash algorithm.
///
/// `/` is treated as `\` and ASCII letters are upper-cased first, so
/// `"Path/To/File"` and `"PATH\\TO\\FILE"` hash identically.
pub fn hash_string(filename: &str, hash_type: u32) -> u32 {
    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;

    for &byte in filename.as_bytes() {
        let ch = if byte == b'/' {
            b'\\'
        } else {
            byte.to_ascii_uppercase()
        };

        let table_idx = (hash_type * 0x100 + ch as u32) as usize;
        seed1 = ENCRYPTION_TABLE[table_idx] ^ seed1.wrapping_add(seed2);
        seed2 = (ch as u32)
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Encryption key of a stored file.
///
/// The key derives from the final path component only. With the FIX_KEY
/// flag it is further adjusted by the block position (relative to the
/// archive start) and the uncompressed size.
pub fn file_key(filename: &str, file_pos: u32, file_size: u32, fix_key: bool) -> u32 {
    let basename = filename.rsplit(['\\', '/']).next().unwrap_or(filename);
    let key = hash_string(basename, hash_type::FILE_KEY);

    if fix_key {
        key.wrapping_add(file_pos) ^ file_size
    } else {
        key
    }
}
