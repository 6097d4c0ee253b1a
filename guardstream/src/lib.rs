// guardstream/src/lib.rs
//! # guardstream CLI
//!
//! Command-line front end for `guardstream-core`: `stream` sanitizes stdin or a file
//! incrementally, `detect` reports what the configured detector finds.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
