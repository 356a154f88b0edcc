//! TOML configuration file loading
//!
//! The file lives at `<config_dir>/Reposcan/reposcan.toml` unless one is
//! named on the command line. Keys are kebab-case and grouped into `[scan]`,
//! `[server]` and `[log]`. Command line flags override the file, the file
//! overrides the built-in defaults.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::args::ScanOptions;
use crate::core::error_handling::ContextualError;
use crate::scanner::acquire::{GixCloneBackend, RepositoryAcquirer};
use crate::scanner::runner::{ExitPolicy, ScannerRunner};
use crate::scanner::types::{ReportFormat, RunPaths};
use crate::scanner::workflow::{RunLayout, ScanWorkflow};

/// Placeholder repository shown in the form
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/django/django.git";
pub const DEFAULT_SCANNER: &str = "bandit";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

const APP_DIR: &str = "Reposcan";
const CONFIG_FILE: &str = "reposcan.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file does not exist: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("error reading configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::NotFound { .. } => {
                Some("The configuration file named on the command line does not exist.")
            }
            ConfigError::Read { .. } => Some("The configuration file could not be read."),
            ConfigError::Parse { .. } => Some("The configuration file is not valid TOML."),
            ConfigError::Invalid { reason, .. } => Some(reason.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub scan: ScanConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScanConfig {
    /// Root of the per-run directories
    pub workspace: Option<PathBuf>,
    /// Fixed working copy; with `report` replaces the per-run layout
    pub clone_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub scanner: String,
    pub format: ReportFormat,
    /// Seconds
    pub clone_timeout: Option<u64>,
    /// Seconds
    pub scan_timeout: Option<u64>,
    pub depth: Option<u32>,
    pub exit_policy: ExitPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            clone_dir: None,
            report: None,
            scanner: DEFAULT_SCANNER.to_string(),
            format: ReportFormat::default(),
            clone_timeout: None,
            scan_timeout: None,
            depth: None,
            exit_policy: ExitPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub default_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            default_url: DEFAULT_REPOSITORY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LogConfig {
    pub level: Option<String>,
    pub file: Option<String>,
    pub format: Option<String>,
    pub color: Option<bool>,
}

/// `<config_dir>/Reposcan/reposcan.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

/// Root for per-run directories when none is configured
pub fn default_workspace() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("runs")
}

impl Config {
    /// Load `explicit` (which must exist) or the default file if present.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = Self::from_toml_str(&contents, &path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ScanConfig {
    /// Apply command line overrides
    pub fn merge(&mut self, options: &ScanOptions) {
        if let Some(workspace) = &options.workspace {
            self.workspace = Some(workspace.clone());
        }
        if let Some(clone_dir) = &options.clone_dir {
            self.clone_dir = Some(clone_dir.clone());
        }
        if let Some(report) = &options.report {
            self.report = Some(report.clone());
        }
        if let Some(format) = options.format {
            self.format = format;
        }
        if let Some(scanner) = &options.scanner {
            self.scanner = scanner.clone();
        }
        if options.clone_timeout.is_some() {
            self.clone_timeout = options.clone_timeout;
        }
        if options.scan_timeout.is_some() {
            self.scan_timeout = options.scan_timeout;
        }
        if options.depth.is_some() {
            self.depth = options.depth;
        }
        if options.lenient {
            self.exit_policy = ExitPolicy::Lenient;
        }
    }

    pub fn layout(&self) -> Result<RunLayout, ConfigError> {
        match (&self.clone_dir, &self.report) {
            (Some(clone_dir), Some(report_path)) => Ok(RunLayout::Fixed(RunPaths {
                clone_dir: clone_dir.clone(),
                report_path: report_path.clone(),
            })),
            (None, None) => Ok(RunLayout::PerRun {
                root: self.workspace.clone().unwrap_or_else(default_workspace),
            }),
            _ => Err(ConfigError::Invalid {
                field: "clone-dir",
                reason: "clone-dir and report must be set together".to_string(),
            }),
        }
    }

    pub fn build_workflow(&self) -> Result<ScanWorkflow, ConfigError> {
        if self.scanner.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "scanner",
                reason: "scanner program must not be empty".to_string(),
            });
        }
        let depth = match self.depth {
            None => None,
            Some(depth) => Some(NonZeroU32::new(depth).ok_or(ConfigError::Invalid {
                field: "depth",
                reason: "depth must be at least 1".to_string(),
            })?),
        };
        if let ExitPolicy::Strict { accepted } = &self.exit_policy {
            if accepted.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "exit-policy",
                    reason: "strict exit policy needs at least one accepted code".to_string(),
                });
            }
        }

        let acquirer = RepositoryAcquirer::new(Arc::new(GixCloneBackend::new(depth)))
            .with_timeout(self.clone_timeout.map(Duration::from_secs));
        let runner = ScannerRunner::new(self.scanner.clone(), self.format)
            .with_exit_policy(self.exit_policy.clone())
            .with_timeout(self.scan_timeout.map(Duration::from_secs));

        Ok(ScanWorkflow::new(acquirer, runner, self.layout()?))
    }
}
