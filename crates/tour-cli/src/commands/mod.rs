//! CLI subcommand implementations.

pub mod busy;
pub mod draft;
pub mod evaluate;
pub mod round;
pub mod show_config;
pub mod util;
