//! # Configuration
//!
//! - `cli`: command-line flags and environment variables
//! - `duration`: retry sleep duration parsing
//! - `settings`: typed settings and the store key / local path layout

pub mod cli;
pub mod duration;
pub mod settings;

pub use cli::{Cli, CliError, LogFormat};
pub use duration::{parse_duration, DurationParseError};
pub use settings::{Component, SettingsError, WatchSettings};
