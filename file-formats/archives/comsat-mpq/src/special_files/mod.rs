//! Special MPQ files handling

mod listfile;

pub use listfile::{LISTFILE_NAME, parse_listfile};
