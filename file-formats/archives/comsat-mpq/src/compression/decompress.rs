//! Codec chain execution

use super::algorithms;
use super::methods::{CompressionStep, decode_chain};
use crate::{Error, Result};
use std::borrow::Cow;

/// Decompress a sector payload (the bytes after the method byte).
///
/// The result must be exactly `expected_size` bytes long.
pub fn decompress(data: &[u8], method: u8, expected_size: usize) -> Result<Vec<u8>> {
    let chain = decode_chain(method)?;

    log::trace!(
        "Decompressing {} bytes to {} bytes with method 0x{:02X} ({:?})",
        data.len(),
        expected_size,
        method,
        chain
    );

    let mut current = Cow::Borrowed(data);
    for step in chain {
        current = Cow::Owned(run_step(step, &current, expected_size)?);
    }

    check_size(current.into_owned(), expected_size)
}

/// Decompress a sector of a file with the IMPLODE block flag.
///
/// Such sectors carry no method byte and are always PKWare DCL streams.
pub fn decompress_imploded(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let output = run_step(CompressionStep::PKWare, data, expected_size)?;
    check_size(output, expected_size)
}

fn run_step(step: CompressionStep, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    match step {
        CompressionStep::BZip2 => algorithms::bzip2::decompress(data, expected_size),
        CompressionStep::PKWare => algorithms::pkware::decompress(data, expected_size),
        CompressionStep::Zlib => algorithms::zlib::decompress(data, expected_size),
        CompressionStep::Sparse => algorithms::sparse::decompress(data, expected_size),
        CompressionStep::Lzma => algorithms::lzma::decompress(data, expected_size),
        CompressionStep::Huffman | CompressionStep::AdpcmStereo | CompressionStep::AdpcmMono => {
            Err(Error::compression(format!(
                "{} decompression is not supported",
                step.name()
            )))
        }
    }
}

fn check_size(output: Vec<u8>, expected_size: usize) -> Result<Vec<u8>> {
    if output.len() != expected_size {
        return Err(Error::compression(format!(
            "Decompressed size mismatch: expected {expected_size}, got {}",
            output.len()
        )));
    }
    Ok(output)
}
