//! BZip2 codec (method 0x10)

use super::output_limit;
use crate::{Error, Result};
use bzip2::Compression;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use std::io::{Read, Write};

/// Decode a bzip2 stream, stopping at [`output_limit`]
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size);
    BzDecoder::new(data)
        .take(output_limit(expected_size))
        .read_to_end(&mut out)
        .map_err(|e| Error::compression(format!("bzip2 stream is invalid: {e}")))?;
    Ok(out)
}

pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generate_compressible_data;

    #[test]
    fn test_replay_sized_block() {
        let details = generate_compressible_data(3000);
        let packed = compress(&details).unwrap();
        assert!(packed.starts_with(b"BZh"));
        assert!(packed.len() < details.len());
        assert_eq!(decompress(&packed, details.len()).unwrap(), details);
    }

    #[test]
    fn test_output_is_bounded() {
        let packed = compress(&[0u8; 4096]).unwrap();
        assert_eq!(decompress(&packed, 100).unwrap().len() as u64, output_limit(100));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            decompress(b"BZh9 but then nonsense", 10),
            Err(Error::Compression(_))
        ));
    }
}
