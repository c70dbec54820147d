//! MPQ table structures (hash and block tables)

mod block;
mod common;
mod hash;

pub use block::{BlockEntry, BlockFlags, BlockTable, HiBlockTable};
pub use hash::{HashEntry, HashSlot, HashTable};

/// Size of one hash or block table entry on disk
pub const TABLE_ENTRY_SIZE: usize = 16;
