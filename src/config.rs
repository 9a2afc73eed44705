//! Scan filtering configuration.
//!
//! This module provides support for loading scan exclusion rules from TOML
//! configuration files. Rules control which directories the scanner
//! descends into and which files it records:
//! - Directory names to prune (VCS folders, build output, caches)
//! - Glob patterns for files to skip
//! - Whether hidden (dot-prefixed) entries are scanned
//!
//! # Configuration File Format
//!
//! ```toml
//! [scan]
//! include_hidden = false
//! exclude_dirs = [".git", ".venv", "__pycache__", "dist", "build"]
//! exclude_patterns = ["*.tmp", "*.part"]
//! ```

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names pruned by default, matching the sort of trees this tool
/// is pointed at (photo dumps mixed with checked-out code).
pub const DEFAULT_EXCLUDE_DIRS: [&str; 7] = [
    ".git",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "dist",
    "build",
];

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for scan filtering, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub scan: ScanRules,
}

/// Root-level scan rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRules {
    /// Whether to scan hidden files and directories. Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Directory names to prune from the walk.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Glob patterns for files to skip (e.g. "*.tmp").
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_dirs() -> Vec<String> {
    DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
}

impl ScanConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.chronotidy.toml` in the current directory
    /// 3. Look for `~/.config/chronotidy/config.toml` in the home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".chronotidy.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("chronotidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile configuration into filter structures the scanner can apply
    /// per entry without reparsing patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn compile(self) -> Result<ScanFilters, ConfigError> {
        ScanFilters::new(self.scan)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan: ScanRules {
                include_hidden: false,
                exclude_dirs: default_exclude_dirs(),
                exclude_patterns: Vec::new(),
            },
        }
    }
}

/// Compiled scan filters: exclusion sets and pre-compiled glob patterns.
pub struct ScanFilters {
    include_hidden: bool,
    exclude_dirs: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
}

impl ScanFilters {
    fn new(rules: ScanRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_dirs: rules.exclude_dirs.into_iter().collect(),
            exclude_patterns,
        })
    }

    /// Whether the walk should descend into a directory with this name.
    pub fn skip_dir(&self, name: &str) -> bool {
        if !self.include_hidden && name.starts_with('.') {
            return true;
        }
        self.exclude_dirs.contains(name)
    }

    /// Whether a regular file should be recorded by the scan.
    pub fn include_file(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(&file_name) || pattern.matches_path(path))
    }
}
