//! Hash kinds fed to [`hash_string`](super::hash_string)

/// Selects which slice of the encryption table a hash walks
pub mod hash_type {
    /// Start slot in the hash table
    pub const TABLE_OFFSET: u32 = 0;
    /// Name check A stored in every hash entry
    pub const NAME_A: u32 = 1;
    /// Name check B stored in every hash entry
    pub const NAME_B: u32 = 2;
    /// Encryption key of tables and files
    pub const FILE_KEY: u32 = 3;
    /// Row the cipher mixes into its running seed
    pub const KEY2_MIX: u32 = 4;
}
