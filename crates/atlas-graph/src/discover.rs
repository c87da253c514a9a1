//! Source file discovery.
//!
//! Walks a project root and collects Python source files, skipping
//! version-control metadata, virtual environments, build output, caches,
//! and hidden directories.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Configuration for source file discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// File extensions to collect, without the leading dot.
    pub extensions: Vec<String>,
    /// Directory names that are never descended into.
    pub exclude_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            exclude_dirs: [
                ".git",
                "__pycache__",
                "venv",
                ".venv",
                "node_modules",
                "dist",
                "build",
                ".tox",
                ".pytest_cache",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Check whether a directory name should be skipped.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.exclude_dirs.iter().any(|d| d == name)
    }

    /// Check whether a file name has one of the configured source suffixes.
    pub fn is_source_file(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            name.strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Collect source files under `root`, sorted by path.
///
/// The root itself is always walked, even if its name would be excluded.
/// Symlinks are collected unless they point at a directory, and are never
/// descended into. A dangling link is kept so the read failure is reported.
/// Unreadable subtrees are skipped without aborting the walk.
pub fn discover_files(root: &Path, config: &DiscoveryConfig) -> Vec<PathBuf> {
    let filter = config.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            !filter.is_excluded_dir(&entry.file_name().to_string_lossy())
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let is_file = entry
            .file_type()
            .is_some_and(|ft| ft.is_file() || (ft.is_symlink() && !entry.path().is_dir()));
        if !is_file {
            continue;
        }
        if config.is_source_file(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    files
}
