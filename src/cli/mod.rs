//! CLI command handlers

pub mod commands;

pub use commands::{append, init, inspect, range, read};
