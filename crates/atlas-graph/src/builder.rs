//! Project analyzer: drives discovery, parsing, extraction and indexing.
//!
//! Files are processed one at a time. A file that fails to read or parse
//! is reported and skipped; it never stops the rest of the run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::discover::{discover_files, DiscoveryConfig};
use crate::entry::{DiskSource, EntryPointDetector, EntryPointRules, SourceCache};
use crate::graph::DependencyGraph;
use crate::index::ProjectIndex;
use crate::lang::python::PythonExtractor;
use crate::parser::{FailureKind, ParseError, Parser};
use crate::store::ProjectAnalysis;
use crate::symbols::{display_path, FileRecord};

/// Error type for run-level analysis failures.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Parser setup failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// Options controlling one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Which files to collect.
    pub discovery: DiscoveryConfig,
    /// How entry points are recognized.
    pub entry_points: EntryPointRules,
    /// Re-read files from disk for the run-guard check instead of using
    /// the text captured during extraction.
    pub reread_sources: bool,
}

/// Statistics from an analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStats {
    /// Number of source files discovered.
    pub files_discovered: usize,
    /// Number of files that produced a record.
    pub files_analyzed: usize,
    /// Number of files skipped after a read or parse failure.
    pub files_skipped: usize,
    /// Time spent reading, parsing and extracting in milliseconds.
    pub parse_time_ms: u64,
}

/// A file that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiagnostic {
    /// Path relative to the project root.
    pub path: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// Everything produced by one run.
#[derive(Debug)]
pub struct AnalysisRun {
    pub analysis: ProjectAnalysis,
    pub stats: AnalysisStats,
    pub diagnostics: Vec<FileDiagnostic>,
}

/// Coordinates the analysis pipeline for a project root.
pub struct ProjectAnalyzer {
    parser: Parser,
    options: AnalyzerOptions,
}

impl ProjectAnalyzer {
    /// Create an analyzer with the given options.
    pub fn new(options: AnalyzerOptions) -> Result<Self> {
        Ok(Self {
            parser: Parser::new()?,
            options,
        })
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze every source file under `root`.
    pub fn analyze(&mut self, root: &Path) -> Result<AnalysisRun> {
        if !root.is_dir() {
            return Err(AnalyzeError::NotADirectory(root.to_path_buf()));
        }

        tracing::info!("Analyzing project: {}", root.display());

        let files = discover_files(root, &self.options.discovery);
        tracing::info!("Found {} source files", files.len());

        let mut stats = AnalysisStats {
            files_discovered: files.len(),
            ..Default::default()
        };
        let mut diagnostics = Vec::new();
        let mut records = Vec::with_capacity(files.len());
        let mut cache = SourceCache::new();

        let parse_start = Instant::now();
        for path in &files {
            let relative = path.strip_prefix(root).unwrap_or(path);
            match self.analyze_file(path, relative) {
                Ok((record, source)) => {
                    tracing::debug!(
                        "Analyzed {}: {} classes, {} functions, {} imports",
                        record.path,
                        record.classes.len(),
                        record.functions.len(),
                        record.imports.len()
                    );
                    cache.insert(record.path.clone(), source);
                    records.push(record);
                    stats.files_analyzed += 1;
                }
                Err(e) => {
                    let diagnostic = FileDiagnostic {
                        path: display_path(relative),
                        kind: e.kind(),
                        detail: e.to_string(),
                    };
                    tracing::warn!(
                        "Skipping {} ({}): {}",
                        path.display(),
                        diagnostic.kind.as_str(),
                        diagnostic.detail
                    );
                    diagnostics.push(diagnostic);
                    stats.files_skipped += 1;
                }
            }
        }
        stats.parse_time_ms = parse_start.elapsed().as_millis() as u64;

        let index = ProjectIndex::from_records(files.len(), records);
        let imports_graph = DependencyGraph::build(&index);

        let detector = EntryPointDetector::new(self.options.entry_points.clone());
        let entry_points = if self.options.reread_sources {
            detector.detect(&index, &DiskSource::new(root))
        } else {
            detector.detect(&index, &cache)
        };

        tracing::info!(
            "Analyzed {} of {} files: {} modules, {} import edges, {} entry points ({}ms)",
            stats.files_analyzed,
            stats.files_discovered,
            index.module_count(),
            imports_graph.edge_count(),
            entry_points.len(),
            stats.parse_time_ms
        );

        Ok(AnalysisRun {
            analysis: ProjectAnalysis::assemble(root, &index, imports_graph, entry_points),
            stats,
            diagnostics,
        })
    }

    /// Read, parse and extract one file.
    ///
    /// Returns the record together with the source text it was built from.
    pub fn analyze_file(
        &mut self,
        path: &Path,
        relative: &Path,
    ) -> std::result::Result<(FileRecord, String), ParseError> {
        let parsed = self.parser.parse_file(path)?;
        let record = PythonExtractor::extract(&parsed.tree, &parsed.source, FileRecord::new(relative));
        Ok((record, parsed.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn analyzer() -> ProjectAnalyzer {
        ProjectAnalyzer::new(AnalyzerOptions::default()).unwrap()
    }

    #[test]
    fn test_analyze_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let err = analyzer().analyze(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, AnalyzeError::NotADirectory(_)));
    }

    #[test]
    fn test_syntax_error_file_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a_good.py", "import os\n\nclass Ok:\n    pass\n");
        write(root, "b_bad.py", "def broken(:\n    pass\n");
        write(root, "c_good.py", "def fine():\n    pass\n");

        let run = analyzer().analyze(root).unwrap();

        assert_eq!(run.stats.files_discovered, 3);
        assert_eq!(run.stats.files_analyzed, 2);
        assert_eq!(run.stats.files_skipped, 1);
        assert_eq!(run.analysis.total_files, 3);

        let modules: Vec<_> = run.analysis.modules.keys().cloned().collect();
        assert_eq!(modules, vec!["a_good", "c_good"]);
        assert_eq!(run.analysis.files.len(), 2);
        assert_eq!(run.analysis.modules["a_good"].classes[0].name, "Ok");

        assert_eq!(run.diagnostics.len(), 1);
        assert_eq!(run.diagnostics[0].path, "b_bad.py");
        assert_eq!(run.diagnostics[0].kind, FailureKind::Syntax);
    }

    #[test]
    fn test_python2_file_is_skipped_as_syntax_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "legacy.py", "class Old:\n    pass\n\nprint \"x\"\n");
        write(root, "modern.py", "print(\"x\")\n");

        let run = analyzer().analyze(root).unwrap();

        assert_eq!(run.stats.files_skipped, 1);
        assert!(!run.analysis.modules.contains_key("legacy"));
        assert!(run.analysis.modules.contains_key("modern"));
        assert_eq!(run.diagnostics[0].path, "legacy.py");
        assert_eq!(run.diagnostics[0].kind, FailureKind::Syntax);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_source_is_analyzed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "vendor/impl.txt", "class Linked:\n    pass\n");
        std::os::unix::fs::symlink(root.join("vendor/impl.txt"), root.join("linked.py")).unwrap();

        let run = analyzer().analyze(root).unwrap();
        assert_eq!(run.analysis.modules["linked"].classes[0].name, "Linked");
    }

    #[test]
    fn test_unreadable_file_is_skipped_as_io() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "ok.py", "x = 1\n");
        fs::write(root.join("binary.py"), [0xff, 0xfe, 0x00]).unwrap();

        let run = analyzer().analyze(root).unwrap();
        assert_eq!(run.stats.files_analyzed, 1);
        assert_eq!(run.diagnostics[0].kind, FailureKind::Io);
    }

    #[test]
    fn test_reread_sources_matches_cached_detection() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "tool.py", "if __name__ == '__main__':\n    pass\n");
        write(root, "lib.py", "VALUE = 1\n");

        let cached = analyzer().analyze(root).unwrap();
        let mut rereading = ProjectAnalyzer::new(AnalyzerOptions {
            reread_sources: true,
            ..Default::default()
        })
        .unwrap();
        let reread = rereading.analyze(root).unwrap();

        assert_eq!(cached.analysis.entry_points, vec!["tool"]);
        assert_eq!(reread.analysis.entry_points, cached.analysis.entry_points);
    }

    #[test]
    fn test_empty_project() {
        let dir = tempdir().unwrap();
        let run = analyzer().analyze(dir.path()).unwrap();
        assert_eq!(run.analysis.total_files, 0);
        assert!(run.analysis.modules.is_empty());
        assert!(run.analysis.entry_points.is_empty());
    }
}
