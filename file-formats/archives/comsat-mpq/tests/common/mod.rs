//! Common test utilities and fixtures

#![allow(dead_code)]

use comsat_mpq::Archive;
use comsat_mpq::test_utils::{TestArchiveConfig, build_test_archive};
use std::io::Cursor;
use tempfile::TempDir;

/// Create a temporary directory for tests
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Route library logging to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build an archive in memory and open it
pub fn open_in_memory(config: &TestArchiveConfig) -> Archive<Cursor<Vec<u8>>> {
    let bytes = build_test_archive(config).expect("Failed to build test archive");
    Archive::from_reader(Cursor::new(bytes)).expect("Failed to open test archive")
}

/// Build an archive in memory, let `patch` modify the bytes, and try to
/// open the result
pub fn open_patched(
    config: &TestArchiveConfig,
    patch: impl FnOnce(&mut Vec<u8>),
) -> comsat_mpq::Result<Archive<Cursor<Vec<u8>>>> {
    let mut bytes = build_test_archive(config).expect("Failed to build test archive");
    patch(&mut bytes);
    Archive::from_reader(Cursor::new(bytes))
}
