//! Deflate codec with zlib framing (method 0x02)

use super::output_limit;
use crate::{Error, Result};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Inflate a zlib stream, stopping at [`output_limit`]
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size);
    ZlibDecoder::new(data)
        .take(output_limit(expected_size))
        .read_to_end(&mut out)
        .map_err(|e| {
            log::trace!(
                "zlib stream starts with {:02X?}",
                &data[..data.len().min(16)]
            );
            Error::compression(format!("zlib stream is invalid: {e}"))
        })?;
    Ok(out)
}

pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
