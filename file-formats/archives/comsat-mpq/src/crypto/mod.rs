//! Cryptographic primitives of the MPQ format
//!
//! MPQ uses one 0x500-entry table of pseudo random words for everything:
//! file name hashing (five hash types, one 0x100 slice each) and the stream
//! cipher that protects the hash table, the block table and encrypted files.
//!
//! ```
//! use comsat_mpq::crypto::{hash_string, hash_type};
//!
//! // Key the hash table is encrypted with
//! assert_eq!(hash_string("(hash table)", hash_type::FILE_KEY), 0xC3AF3770);
//! ```

mod decryption;
mod encryption;
mod hash;
mod keys;
mod types;

pub use decryption::{decrypt_block, decrypt_bytes};
pub use encryption::{encrypt_block, encrypt_bytes};
pub use hash::{file_key, hash_string};
pub use keys::ENCRYPTION_TABLE;
pub use types::hash_type;

/// Calculate the three lookup hashes of a file name.
///
/// Returns `(hash_offset, hash_a, hash_b)`. Separators are normalized and
/// case is folded inside [`hash_string`].
pub fn calculate_mpq_hashes(filename: &str) -> (u32, u32, u32) {
    (
        hash_string(filename, hash_type::TABLE_OFFSET),
        hash_string(filename, hash_type::NAME_A),
        hash_string(filename, hash_type::NAME_B),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_mpq_hashes_matches_individual_hashes() {
        let (offset, a, b) = calculate_mpq_hashes("replay.details");
        assert_eq!(offset, hash_string("replay.details", hash_type::TABLE_OFFSET));
        assert_eq!(a, hash_string("replay.details", hash_type::NAME_A));
        assert_eq!(b, hash_string("replay.details", hash_type::NAME_B));
        assert_ne!(a, b);
    }
}
