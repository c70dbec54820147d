//! Feature integration tests
//!
//! These tests verify complete features work correctly end-to-end.

pub mod archive_reading;
pub mod extraction;
pub mod format_errors;
pub mod hashing;
