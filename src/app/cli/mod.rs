//! Command line interface: arguments, configuration and terminal output

pub mod args;
pub mod config;
pub mod display;

pub use args::{Args, Command, ScanOptions};
pub use config::{Config, ConfigError};
