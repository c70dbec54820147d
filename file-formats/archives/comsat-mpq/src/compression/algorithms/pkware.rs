//! PKWare DCL compression using pklib

use super::output_limit;
use crate::{Error, Result};
use pklib::{CompressionMode, DictionarySize, ExplodeReader, implode_bytes};
use std::io::{Cursor, Read};

/// Explode a PKWare DCL stream, stopping at [`output_limit`]
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let failed = |e: &dyn std::fmt::Display| {
        log::debug!(
            "PKWare input of {} bytes failed, first bytes: {:02X?}",
            data.len(),
            &data[..data.len().min(16)]
        );
        Error::compression(format!("PKWare decompression failed: {e}"))
    };

    let reader = ExplodeReader::new(Cursor::new(data)).map_err(|e| failed(&e))?;
    let mut out = Vec::with_capacity(expected_size);
    reader
        .take(output_limit(expected_size))
        .read_to_end(&mut out)
        .map_err(|e| failed(&e))?;
    Ok(out)
}

/// Implode with binary mode and a 4 KiB dictionary
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    implode_bytes(data, CompressionMode::Binary, DictionarySize::Size4K)
        .map_err(|e| Error::compression(format!("PKWare compression failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkware_roundtrip() {
        let original = b"This is a test of PKWare compression and decompression. ".repeat(8);
        let compressed = compress(&original).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(&compressed, original.len()).unwrap(), original);
    }

    #[test]
    fn test_output_is_bounded() {
        let compressed = compress(&[0u8; 16384]).unwrap();
        let out = decompress(&compressed, 256).unwrap();
        assert_eq!(out.len() as u64, output_limit(256));
    }
}
