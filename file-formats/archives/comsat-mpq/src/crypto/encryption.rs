//! Encryption operations for MPQ files
//!
//! The reader never encrypts; these are the inverse of [`super::decrypt_block`]
//! and back the synthetic archives written by the test utilities.

use super::keys::ENCRYPTION_TABLE;
use byteorder::{ByteOrder, LittleEndian};

/// Encrypt a block of little-endian words in place
pub fn encrypt_block(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let plain = *value;
        *value = plain ^ key.wrapping_add(seed);

        key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Encrypt a byte buffer in place, leaving a trailing partial word as is
pub fn encrypt_bytes(data: &mut [u8], key: u32) {
    let word_len = data.len() / 4 * 4;
    let (words, _tail) = data.split_at_mut(word_len);

    let mut buffer = vec![0u32; words.len() / 4];
    LittleEndian::read_u32_into(words, &mut buffer);
    encrypt_block(&mut buffer, key);
    LittleEndian::write_u32_into(&buffer, words);
}
