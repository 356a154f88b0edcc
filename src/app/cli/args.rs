//! Command line arguments
//!
//! Global flags control configuration and logging; the subcommand picks the
//! surface. Scan options are shared by `scan` and `serve` so both can
//! override the `[scan]` section of the config file.

use clap::{ArgMatches, Args as ClapArgs, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::core::styles::palette_to_clap;
use crate::core::version::long_version;
use crate::scanner::types::ReportFormat;

#[derive(Parser, Debug, Clone)]
#[command(name = "reposcan")]
#[command(about = "Clone a git repository and run a security scanner over it")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Force coloured output
    #[arg(long = "color", global = true)]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", conflicts_with = "color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Clone a repository, scan it and print the summary and report
    Scan(ScanCommand),
    /// Serve the web form
    Serve(ServeCommand),
    /// Remove working copies and reports left by earlier runs
    Clean(CleanCommand),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanCommand {
    /// Repository URL to clone
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub options: ScanOptions,

    /// Do not print the raw report
    #[arg(long = "no-report", conflicts_with = "json")]
    pub no_report: bool,

    /// Print the whole outcome as JSON
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// URL pre-filled in the form
    #[arg(long = "default-url", value_name = "URL")]
    pub default_url: Option<String>,

    #[command(flatten)]
    pub options: ScanOptions,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CleanCommand {
    #[command(flatten)]
    pub options: ScanOptions,
}

/// Overrides for the `[scan]` section
#[derive(ClapArgs, Debug, Clone, Default, PartialEq)]
pub struct ScanOptions {
    /// Directory holding one sub-directory per run
    #[arg(short = 'w', long = "workspace", value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Fixed working copy path (requires --report)
    #[arg(long = "clone-dir", value_name = "DIR", requires = "report")]
    pub clone_dir: Option<PathBuf>,

    /// Fixed report path (requires --clone-dir)
    #[arg(long = "report", value_name = "FILE", requires = "clone_dir")]
    pub report: Option<PathBuf>,

    /// Report format requested from the scanner
    #[arg(long = "format", value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Scanner executable
    #[arg(long = "scanner", value_name = "PROGRAM")]
    pub scanner: Option<String>,

    /// Clone timeout in seconds
    #[arg(long = "clone-timeout", value_name = "SECS")]
    pub clone_timeout: Option<u64>,

    /// Scanner timeout in seconds
    #[arg(long = "scan-timeout", value_name = "SECS")]
    pub scan_timeout: Option<u64>,

    /// Ignore the scanner's exit status
    #[arg(long = "lenient")]
    pub lenient: bool,

    /// Shallow clone depth
    #[arg(long = "depth", value_name = "N")]
    pub depth: Option<u32>,
}

impl Args {
    /// Parse `args` with help styled to match the colour choice
    pub fn try_parse_styled<I, T>(args: I, color: bool) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches: ArgMatches = Self::command()
            .styles(palette_to_clap(color))
            .long_version(long_version())
            .try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Explicit colour choice from the flags, `None` when neither was given
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Scan(_) => "scan",
            Command::Serve(_) => "serve",
            Command::Clean(_) => "clean",
        }
    }

    pub fn scan_options(&self) -> &ScanOptions {
        match self {
            Command::Scan(cmd) => &cmd.options,
            Command::Serve(cmd) => &cmd.options,
            Command::Clean(cmd) => &cmd.options,
        }
    }
}
