//! Sector compression
//!
//! The reader never compresses archives; this is the inverse of
//! [`super::decompress`] used to produce synthetic sectors.

use super::algorithms;
use super::methods::{CompressionStep, decode_chain};
use crate::{Error, Result};

/// Compress data using the specified method byte.
///
/// Returns the method byte followed by the compressed payload, or the input
/// unchanged when compression does not save space (such sectors are stored
/// verbatim).
pub fn compress(data: &[u8], method: u8) -> Result<Vec<u8>> {
    let mut chain = decode_chain(method)?;
    chain.reverse();

    let mut compressed = data.to_vec();
    for step in chain {
        compressed = match step {
            CompressionStep::BZip2 => algorithms::bzip2::compress(&compressed)?,
            CompressionStep::PKWare => algorithms::pkware::compress(&compressed)?,
            CompressionStep::Zlib => algorithms::zlib::compress(&compressed)?,
            CompressionStep::Sparse => algorithms::sparse::compress(&compressed)?,
            CompressionStep::Lzma => algorithms::lzma::compress(&compressed)?,
            other => {
                return Err(Error::compression(format!(
                    "{} compression is not supported",
                    other.name()
                )));
            }
        };
    }

    if 1 + compressed.len() >= data.len() {
        Ok(data.to_vec())
    } else {
        let mut result = Vec::with_capacity(1 + compressed.len());
        result.push(method);
        result.extend_from_slice(&compressed);
        Ok(result)
    }
}

/// Compress data as a PKWare DCL stream without a method byte, the layout
/// of files with the IMPLODE block flag.
pub fn implode(data: &[u8]) -> Result<Vec<u8>> {
    algorithms::pkware::compress(data)
}
