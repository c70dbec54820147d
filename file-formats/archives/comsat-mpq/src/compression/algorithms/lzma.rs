//! LZMA compression and decompression
//!
//! MPQ stores LZMA sectors as a one byte filter marker (always 0) followed
//! by a regular `.lzma` stream (5 property bytes, 64-bit size, data).

use super::output_limit;
use crate::{Error, Result};
use lzma_rs::decompress::{Options, UnpackedSize};
use std::io::{BufReader, Cursor};

const FILTER_NONE: u8 = 0;

/// Decompress an MPQ LZMA sector payload
///
/// The size stored in the stream header is read but not trusted, decoding
/// stops after `expected_size` bytes.
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let Some((&filter, stream)) = data.split_first() else {
        return Err(Error::compression("Empty LZMA payload"));
    };
    if filter != FILTER_NONE {
        return Err(Error::compression(format!(
            "Unsupported LZMA filter byte 0x{filter:02X}"
        )));
    }

    let options = Options {
        unpacked_size: UnpackedSize::ReadHeaderButUseProvided(Some(expected_size as u64)),
        memlimit: Some(output_limit(expected_size) as usize),
        allow_incomplete: false,
    };
    let mut input = BufReader::new(Cursor::new(stream));
    let mut output = Vec::with_capacity(expected_size);
    lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options)
        .map_err(|e| Error::compression(format!("LZMA decompression failed: {e:?}")))?;

    Ok(output)
}

/// Compress into an MPQ LZMA sector payload
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = BufReader::new(Cursor::new(data));
    let mut output = vec![FILTER_NONE];

    lzma_rs::lzma_compress(&mut input, &mut output)
        .map_err(|e| Error::compression(format!("LZMA compression failed: {e:?}")))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lzma_rs::compress;

    #[test]
    fn test_round_trip() {
        let original = b"LZMA test data. ".repeat(20);
        let compressed = compress(&original).unwrap();
        assert_eq!(compressed[0], FILTER_NONE);
        assert_eq!(decompress(&compressed, original.len()).unwrap(), original);
    }

    #[test]
    fn test_filter_byte_is_checked() {
        let mut compressed = compress(b"abcabcabc").unwrap();
        compressed[0] = 1;
        assert!(decompress(&compressed, 9).is_err());
        assert!(decompress(&[], 9).is_err());
    }

    #[test]
    fn test_header_size_is_not_trusted() {
        let original = vec![0x5Au8; 4096];
        let mut payload = vec![FILTER_NONE];
        lzma_rs::lzma_compress_with_options(
            &mut BufReader::new(Cursor::new(&original)),
            &mut payload,
            &compress::Options {
                unpacked_size: compress::UnpackedSize::WriteToHeader(Some(1 << 40)),
            },
        )
        .unwrap();

        assert_eq!(decompress(&payload, 4096).unwrap(), original);
        assert_eq!(decompress(&payload, 100).unwrap(), &original[..100]);
    }
}
