//! Compression and decompression algorithms for MPQ sectors
//!
//! Every compressed sector starts with a method byte. Its bits select the
//! codecs that were applied; decoding runs them as an ordered chain of
//! [`CompressionStep`]s.

mod algorithms;
mod compress;
mod decompress;
mod methods;

pub use compress::{compress, implode};
pub use decompress::{decompress, decompress_imploded};
pub use methods::{CompressionStep, decode_chain, flags};
