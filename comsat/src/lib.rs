//! comsat library
//!
//! Command implementations behind the `comsat` binary: replay and map
//! extraction plus archive inspection, built on `comsat_mpq`.

pub mod cli;
pub mod commands;
pub mod replay_header;
pub mod utils;
