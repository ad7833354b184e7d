//! Tour scheduling CLI library.
//!
//! This crate provides the command-line driver for `tour-core`.

mod cli;
pub mod commands;
mod config;
pub mod feed_file;

pub use cli::{Cli, Commands, Target};
pub use config::Config;
