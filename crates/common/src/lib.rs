//! Shared runtime helpers for the mapper binaries.

pub mod utils;
