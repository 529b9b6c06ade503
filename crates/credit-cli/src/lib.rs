//! Command handlers behind the `credit` binary.
pub mod commands;
pub mod util;
