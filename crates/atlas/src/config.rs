//! Configuration file support for atlas.
//!
//! Project-level settings live in `.atlas/config.toml`. Discovery starts at
//! the analyzed root and walks up through parent directories, so a config
//! at a repository root also covers analyses of its subdirectories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atlas_graph::{AnalyzerOptions, DiscoveryConfig, EntryPointRules};
use serde::Deserialize;

/// The atlas settings directory name.
pub const ATLAS_DIR: &str = ".atlas";
/// The config file name within the settings directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Template written by `atlas init`.
pub const DEFAULT_CONFIG: &str = r#"# atlas configuration
# Relative paths resolve against the analyzed project root unless noted

[analysis]
extensions = ["py"]
exclude_dirs = [".git", "__pycache__", "venv", ".venv", "node_modules", "dist", "build", ".tox", ".pytest_cache"]
entry_names = ["__main__", "main", "app", "run"]
run_guard = "__main__"
# output = ".claude/project_analysis.json"
reread_sources = false

[logging]
# Rotating log files, relative to this .atlas/ directory
# dir = "logs"
"#;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis settings.
    pub analysis: AnalysisConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Analysis configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Source file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
    /// Final module-name segments that mark an entry point.
    pub entry_names: Vec<String>,
    /// Literal whose presence in a file marks it runnable.
    pub run_guard: String,
    /// Artifact location override.
    pub output: Option<PathBuf>,
    /// Re-read files from disk when checking for the run guard.
    pub reread_sources: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let discovery = DiscoveryConfig::default();
        let rules = EntryPointRules::default();
        Self {
            extensions: discovery.extensions,
            exclude_dirs: discovery.exclude_dirs,
            entry_names: rules.names,
            run_guard: rules.run_guard,
            output: None,
            reread_sources: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily log files. Relative to the `.atlas/` directory.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Find and load configuration starting from a specific directory.
    ///
    /// Looks for `.atlas/config.toml` in the directory and its parents and
    /// returns the config together with the `.atlas` directory it came from.
    pub fn find_and_load_from(start: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start.to_path_buf();

        loop {
            let atlas_dir = dir.join(ATLAS_DIR);
            let config_path = atlas_dir.join(CONFIG_FILE);
            if config_path.is_file() {
                let config = Self::from_file(&config_path)?;
                return Ok(Some((config, atlas_dir)));
            }

            if !dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Analyzer options described by this config.
    pub fn to_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            discovery: DiscoveryConfig {
                extensions: self.analysis.extensions.clone(),
                exclude_dirs: self.analysis.exclude_dirs.clone(),
            },
            entry_points: EntryPointRules {
                names: self.analysis.entry_names.clone(),
                run_guard: self.analysis.run_guard.clone(),
            },
            reread_sources: self.analysis.reread_sources,
        }
    }

    /// Resolve the configured artifact path for a project root.
    ///
    /// Returns `None` when no override is configured.
    pub fn resolve_output(&self, root: &Path) -> Option<PathBuf> {
        self.analysis.output.as_ref().map(|p| resolve_against(root, p))
    }

    /// Resolve the log directory relative to the `.atlas` directory.
    pub fn resolve_log_dir(&self, atlas_dir: Option<&Path>) -> Option<PathBuf> {
        let dir = self.logging.dir.as_ref()?;
        Some(match atlas_dir {
            Some(base) => resolve_against(base, dir),
            None => resolve_against(Path::new(ATLAS_DIR), dir),
        })
    }
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Configuration validation error.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigValidationError {}

impl Config {
    /// Validate the configuration.
    ///
    /// Returns a list of validation errors if any are found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.analysis.extensions.is_empty() {
            errors.push(ConfigValidationError {
                field: "analysis.extensions".to_string(),
                message: "No extensions configured; no files will be analyzed.".to_string(),
            });
        }

        if let Some(ext) = self
            .analysis
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            errors.push(ConfigValidationError {
                field: "analysis.extensions".to_string(),
                message: format!(
                    "Invalid extension '{}'. Use the bare suffix, like \"py\".",
                    ext
                ),
            });
        }

        if self.analysis.run_guard.is_empty() {
            errors.push(ConfigValidationError {
                field: "analysis.run_guard".to_string(),
                message: "Run guard is empty; only entry names will be detected.".to_string(),
            });
        }

        if self.analysis.entry_names.iter().any(|name| name.contains('.')) {
            errors.push(ConfigValidationError {
                field: "analysis.entry_names".to_string(),
                message: "Entry names match the final module segment and cannot contain '.'."
                    .to_string(),
            });
        }

        errors
    }
}
