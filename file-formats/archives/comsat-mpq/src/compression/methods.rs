//! Compression method definitions and flags

use crate::{Error, Result};

/// Compression method flags
pub mod flags {
    /// Huffman encoding (WAVE files only)
    pub const HUFFMAN: u8 = 0x01;
    /// Deflate/zlib compression
    pub const ZLIB: u8 = 0x02;
    /// PKWare DCL compression
    pub const PKWARE: u8 = 0x08;
    /// BZip2 compression
    pub const BZIP2: u8 = 0x10;
    /// Sparse/RLE compression
    pub const SPARSE: u8 = 0x20;
    /// IMA ADPCM mono
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM stereo
    pub const ADPCM_STEREO: u8 = 0x80;
    /// LZMA compression (a standalone tag, not a flag combination)
    pub const LZMA: u8 = 0x12;
}

/// One decoder step of a sector's codec chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionStep {
    /// BZip2
    BZip2,
    /// PKWare DCL explode
    PKWare,
    /// Deflate/zlib
    Zlib,
    /// Huffman (recognized, not supported)
    Huffman,
    /// IMA ADPCM stereo (recognized, not supported)
    AdpcmStereo,
    /// IMA ADPCM mono (recognized, not supported)
    AdpcmMono,
    /// Sparse/RLE
    Sparse,
    /// LZMA
    Lzma,
}

/// Decoding order of the flag based methods; compression runs in reverse.
const DECODE_ORDER: [CompressionStep; 7] = [
    CompressionStep::BZip2,
    CompressionStep::PKWare,
    CompressionStep::Zlib,
    CompressionStep::Huffman,
    CompressionStep::AdpcmStereo,
    CompressionStep::AdpcmMono,
    CompressionStep::Sparse,
];

impl CompressionStep {
    /// Method byte bits that select this step
    pub fn flag(self) -> u8 {
        match self {
            CompressionStep::BZip2 => flags::BZIP2,
            CompressionStep::PKWare => flags::PKWARE,
            CompressionStep::Zlib => flags::ZLIB,
            CompressionStep::Huffman => flags::HUFFMAN,
            CompressionStep::AdpcmStereo => flags::ADPCM_STEREO,
            CompressionStep::AdpcmMono => flags::ADPCM_MONO,
            CompressionStep::Sparse => flags::SPARSE,
            CompressionStep::Lzma => flags::LZMA,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            CompressionStep::BZip2 => "BZip2",
            CompressionStep::PKWare => "PKWare",
            CompressionStep::Zlib => "Zlib",
            CompressionStep::Huffman => "Huffman",
            CompressionStep::AdpcmStereo => "ADPCM stereo",
            CompressionStep::AdpcmMono => "ADPCM mono",
            CompressionStep::Sparse => "Sparse",
            CompressionStep::Lzma => "LZMA",
        }
    }

    /// Whether this crate can decode the step
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            CompressionStep::Huffman | CompressionStep::AdpcmStereo | CompressionStep::AdpcmMono
        )
    }
}

/// Build the decoder chain for a sector method byte.
///
/// Steps are returned in the order they must be applied. Bits that name no
/// known method are rejected.
pub fn decode_chain(method: u8) -> Result<Vec<CompressionStep>> {
    if method == flags::LZMA {
        return Ok(vec![CompressionStep::Lzma]);
    }

    let chain: Vec<CompressionStep> = DECODE_ORDER
        .iter()
        .copied()
        .filter(|step| method & step.flag() != 0)
        .collect();

    let known = chain.iter().fold(0u8, |acc, step| acc | step.flag());
    if method & !known != 0 {
        return Err(Error::compression(format!(
            "Unknown compression flags 0x{:02X} in method byte 0x{method:02X}",
            method & !known
        )));
    }

    Ok(chain)
}
