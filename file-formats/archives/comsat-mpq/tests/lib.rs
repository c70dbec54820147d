//! Integration tests for comsat_mpq
//!
//! Unit tests live next to the code in src/. These tests drive the public
//! API against synthetic archives written by `comsat_mpq::test_utils`.

// Common test utilities
mod common;

// Feature integration tests
mod integration;
