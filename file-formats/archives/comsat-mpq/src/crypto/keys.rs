//! The MPQ encryption table

/// Number of words in the encryption table (five slices of 0x100).
pub(crate) const TABLE_LEN: usize = 0x500;

/// Pseudo random table shared by hashing and the block cipher.
pub static ENCRYPTION_TABLE: [u32; TABLE_LEN] = generate_encryption_table();

const fn generate_encryption_table() -> [u32; TABLE_LEN] {
    let mut table = [0u32; TABLE_LEN];
    let mut seed: u32 = 0x0010_0001;

    let mut index1 = 0;
    while index1 < 0x100 {
        let mut index2 = index1;
        let mut i = 0;
        while i < 5 {
            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let temp1 = (seed & 0xFFFF) << 0x10;

            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let temp2 = seed & 0xFFFF;

            table[index2] = temp1 | temp2;
            index2 += 0x100;
            i += 1;
        }
        index1 += 1;
    }

    table
}
