//! Individual codec implementations

pub(crate) mod bzip2;
pub(crate) mod lzma;
pub(crate) mod pkware;
pub(crate) mod sparse;
pub(crate) mod zlib;

/// Most bytes a stream codec may produce for a sector of `expected_size`
///
/// Inner steps of a chain can legitimately exceed the final size (sparse
/// encoding adds control bytes), so the bound is loose. It stops runaway
/// streams, and the exact length is checked after the whole chain.
pub(crate) fn output_limit(expected_size: usize) -> u64 {
    expected_size as u64 * 2 + 64
}
