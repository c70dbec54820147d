//! Test utilities for MPQ archives
//!
//! The [`mpq_builder`] module writes small synthetic archives so that the
//! reader can be tested without shipping game data. It is compiled for this
//! crate's tests and behind the `test-utils` feature for dependent crates.

pub mod mpq_builder;

pub use mpq_builder::{
    FileOptions, SAMPLE_REPLAY_HEADER, TestArchiveConfig, TestFile, build_test_archive,
    create_test_archive, encode_file_data, generate_binary_pattern, generate_compressible_data,
    generate_sparse_data,
};
