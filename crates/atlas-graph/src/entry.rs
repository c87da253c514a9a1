//! Entry-point detection.
//!
//! A module is a probable program entry point when its final name segment
//! is a conventional entry filename, or when its source text contains the
//! run-as-script guard. The text check is a plain substring search, so a
//! guard mentioned in a comment or string also counts.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::index::ProjectIndex;
use crate::symbols::FileRecord;

/// Rules for classifying entry points.
#[derive(Debug, Clone)]
pub struct EntryPointRules {
    /// Conventional entry file stems, checked in order.
    pub names: Vec<String>,
    /// Literal whose presence in the source marks a runnable script.
    pub run_guard: String,
}

impl Default for EntryPointRules {
    fn default() -> Self {
        Self {
            names: ["__main__", "main", "app", "run"]
                .into_iter()
                .map(String::from)
                .collect(),
            run_guard: "__main__".to_string(),
        }
    }
}

/// Access to the raw source text behind a file record.
pub trait SourceText {
    /// Source text for `record`, or `None` if it is unavailable.
    fn source_text(&self, record: &FileRecord) -> Option<Cow<'_, str>>;
}

/// Source text captured while the files were extracted.
#[derive(Debug, Default)]
pub struct SourceCache {
    by_path: HashMap<String, String>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the text for a record path.
    pub fn insert(&mut self, path: impl Into<String>, source: String) {
        self.by_path.insert(path.into(), source);
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

impl SourceText for SourceCache {
    fn source_text(&self, record: &FileRecord) -> Option<Cow<'_, str>> {
        self.by_path
            .get(&record.path)
            .map(|s| Cow::Borrowed(s.as_str()))
    }
}

/// Re-reads source text from disk on every lookup.
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl SourceText for DiskSource {
    fn source_text(&self, record: &FileRecord) -> Option<Cow<'_, str>> {
        let path = self.root.join(&record.path);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(Cow::Owned(text)),
            Err(e) => {
                tracing::debug!("Could not re-read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Flags entry-point modules in a project index.
#[derive(Debug, Clone, Default)]
pub struct EntryPointDetector {
    rules: EntryPointRules,
}

impl EntryPointDetector {
    pub fn new(rules: EntryPointRules) -> Self {
        Self { rules }
    }

    /// Detect entry points, deduplicated in first-seen order.
    ///
    /// Name matches come first (grouped by entry name), followed by
    /// run-guard matches in file order.
    pub fn detect(&self, index: &ProjectIndex, sources: &dyn SourceText) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut entry_points = Vec::new();

        for entry_name in &self.rules.names {
            for (module, record) in index.modules() {
                if record.module_stem() == entry_name && seen.insert(module.to_string()) {
                    entry_points.push(module.to_string());
                }
            }
        }

        if !self.rules.run_guard.is_empty() {
            for record in index.files() {
                let has_guard = sources
                    .source_text(record)
                    .is_some_and(|text| text.contains(self.rules.run_guard.as_str()));
                if has_guard && seen.insert(record.module.clone()) {
                    entry_points.push(record.module.clone());
                }
            }
        }

        entry_points
    }

    pub fn rules(&self) -> &EntryPointRules {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(files: &[(&str, &str)]) -> (ProjectIndex, SourceCache) {
        let mut cache = SourceCache::new();
        let records = files
            .iter()
            .map(|(path, source)| {
                let record = FileRecord::new(Path::new(path));
                cache.insert(record.path.clone(), source.to_string());
                record
            })
            .collect::<Vec<_>>();
        (ProjectIndex::from_records(records.len(), records), cache)
    }

    #[test]
    fn test_name_convention_matches_final_segment() {
        let (index, cache) = index_with(&[
            ("main.py", ""),
            ("pkg/app.py", ""),
            ("pkg/__main__.py", ""),
            ("domain.py", ""),
            ("runner.py", ""),
        ]);

        let entries = EntryPointDetector::default().detect(&index, &cache);
        assert_eq!(entries, vec!["pkg.__main__", "main", "pkg.app"]);
    }

    #[test]
    fn test_run_guard_matches_any_module() {
        let (index, cache) = index_with(&[
            ("tools/script.py", "if __name__ == \"__main__\":\n    run()\n"),
            ("lib.py", "def f():\n    pass\n"),
        ]);

        let entries = EntryPointDetector::default().detect(&index, &cache);
        assert_eq!(entries, vec!["tools.script"]);
    }

    #[test]
    fn test_guard_in_comment_counts() {
        let (index, cache) = index_with(&[("notes.py", "# do not use __main__ here\n")]);
        let entries = EntryPointDetector::default().detect(&index, &cache);
        assert_eq!(entries, vec!["notes"]);
    }

    #[test]
    fn test_both_rules_do_not_duplicate() {
        let (index, cache) = index_with(&[(
            "main.py",
            "if __name__ == '__main__':\n    main()\n",
        )]);

        let entries = EntryPointDetector::default().detect(&index, &cache);
        assert_eq!(entries, vec!["main"]);
    }

    #[test]
    fn test_missing_source_is_not_a_match() {
        let (index, _) = index_with(&[("script.py", "if __name__ == '__main__': pass\n")]);
        let entries = EntryPointDetector::default().detect(&index, &SourceCache::new());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_custom_rules() {
        let (index, cache) = index_with(&[("serve.py", ""), ("cli.py", "# entry: cli\n")]);
        let detector = EntryPointDetector::new(EntryPointRules {
            names: vec!["serve".to_string()],
            run_guard: "entry: cli".to_string(),
        });
        assert_eq!(detector.detect(&index, &cache), vec!["serve", "cli"]);
    }

    #[test]
    fn test_disk_source_rereads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/tool.py"), "if __name__ == '__main__': pass\n")
            .unwrap();

        let record = FileRecord::new(Path::new("pkg/tool.py"));
        let index = ProjectIndex::from_records(1, vec![record]);
        let entries = EntryPointDetector::default().detect(&index, &DiskSource::new(dir.path()));
        assert_eq!(entries, vec!["pkg.tool"]);
    }
}
