//! Decryption operations for MPQ files

use super::keys::ENCRYPTION_TABLE;
use byteorder::{ByteOrder, LittleEndian};

/// Decrypt a block of little-endian words in place
pub fn decrypt_block(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let ch = *value ^ key.wrapping_add(seed);
        *value = ch;

        key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
        seed = ch
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Decrypt a byte buffer in place.
///
/// Only whole words are decrypted; a trailing remainder of one to three
/// bytes is stored in the clear and left as is.
pub fn decrypt_bytes(data: &mut [u8], key: u32) {
    let word_len = data.len() / 4 * 4;
    let (words, _tail) = data.split_at_mut(word_len);

    let mut buffer = vec![0u32; words.len() / 4];
    LittleEndian::read_u32_into(words, &mut buffer);
    decrypt_block(&mut buffer, key);
    LittleEndian::write_u32_into(&buffer, words);
}
