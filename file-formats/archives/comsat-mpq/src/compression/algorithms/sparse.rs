//! Sparse (zero run) compression and decompression
//!
//! Layout: a big-endian u32 holding the decompressed size, then chunks. A
//! control byte with the high bit set is followed by `(b & 0x7F) + 1`
//! literal bytes; otherwise it stands for `(b & 0x7F) + 3` zero bytes.

use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

const MAX_LITERAL_RUN: usize = 0x80;
const MIN_ZERO_RUN: usize = 3;
const MAX_ZERO_RUN: usize = 0x82;

/// Decompress sparse data
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if data.len() < 4 {
        return Err(Error::compression("Sparse stream shorter than its size field"));
    }

    let declared = BigEndian::read_u32(&data[..4]) as usize;
    if declared > expected_size {
        return Err(Error::compression(format!(
            "Sparse stream declares {declared} bytes, at most {expected_size} expected"
        )));
    }

    let mut output = Vec::with_capacity(declared);
    let mut pos = 4;

    while pos < data.len() && output.len() < declared {
        let control = data[pos];
        pos += 1;
        let remaining = declared - output.len();

        if control & 0x80 != 0 {
            let run = (control & 0x7F) as usize + 1;
            let Some(literal) = data.get(pos..pos + run) else {
                return Err(Error::compression(format!(
                    "Sparse literal run of {run} bytes overruns the input"
                )));
            };
            output.extend_from_slice(&literal[..run.min(remaining)]);
            pos += run;
        } else {
            let run = (control & 0x7F) as usize + MIN_ZERO_RUN;
            output.resize(output.len() + run.min(remaining), 0);
        }
    }

    Ok(output)
}

/// Compress using sparse encoding
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let size = u32::try_from(data.len())
        .map_err(|_| Error::compression("Sparse input larger than 4 GiB"))?;

    let mut output = Vec::with_capacity(data.len() / 2 + 8);
    output.extend_from_slice(&size.to_be_bytes());

    let mut literal_start = 0;
    let mut pos = 0;

    while pos < data.len() {
        let zeros = data[pos..].iter().take_while(|&&b| b == 0).count();
        if zeros < MIN_ZERO_RUN {
            pos += zeros.max(1);
            continue;
        }

        flush_literals(&mut output, &data[literal_start..pos]);

        let mut left = zeros;
        while left >= MIN_ZERO_RUN {
            let run = left.min(MAX_ZERO_RUN);
            output.push((run - MIN_ZERO_RUN) as u8);
            left -= run;
        }

        // A tail of one or two zeros is carried as literal bytes.
        pos += zeros;
        literal_start = pos - left;
    }

    flush_literals(&mut output, &data[literal_start..]);
    Ok(output)
}

fn flush_literals(output: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERAL_RUN) {
        output.push(0x80 | (chunk.len() - 1) as u8);
        output.extend_from_slice(chunk);
    }
}
