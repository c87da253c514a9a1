//! Analysis artifact persistence.
//!
//! The artifact is the JSON document that documentation renderers consume.
//! Its top-level fields are fixed: `project_root`, `total_files`,
//! `modules`, `imports_graph`, `entry_points` and `files`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;
use crate::index::ProjectIndex;
use crate::symbols::{ClassInfo, FileRecord, FunctionInfo};

/// Directory (relative to the project root) holding the artifact.
pub const ARTIFACT_DIR: &str = ".claude";
/// Artifact file name within [`ARTIFACT_DIR`].
pub const ARTIFACT_FILE: &str = "project_analysis.json";

/// Error type for artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid analysis document {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Per-module entry in the `modules` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub path: String,
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub imports: Vec<String>,
}

impl From<&FileRecord> for ModuleEntry {
    fn from(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            classes: record.classes.clone(),
            functions: record.functions.clone(),
            imports: record.imports.clone(),
        }
    }
}

/// The structured analysis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_root: String,
    pub total_files: usize,
    pub modules: BTreeMap<String, ModuleEntry>,
    pub imports_graph: DependencyGraph,
    pub entry_points: Vec<String>,
    pub files: Vec<FileRecord>,
}

impl ProjectAnalysis {
    /// Assemble the document from the index and its derived analyses.
    pub fn assemble(
        project_root: &Path,
        index: &ProjectIndex,
        imports_graph: DependencyGraph,
        entry_points: Vec<String>,
    ) -> Self {
        Self {
            project_root: project_root.display().to_string(),
            total_files: index.total_files(),
            modules: index
                .modules()
                .map(|(name, record)| (name.to_string(), ModuleEntry::from(record)))
                .collect(),
            imports_graph,
            entry_points,
            files: index.files().to_vec(),
        }
    }

    /// Total classes across all analyzed files.
    pub fn class_count(&self) -> usize {
        self.files.iter().map(|f| f.classes.len()).sum()
    }

    /// Total module-level functions across all analyzed files.
    pub fn function_count(&self) -> usize {
        self.files.iter().map(|f| f.functions.len()).sum()
    }

    /// Serialize as pretty-printed JSON (two-space indent, UTF-8 kept as is).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Default artifact location for a project root.
pub fn default_artifact_path(root: &Path) -> PathBuf {
    root.join(ARTIFACT_DIR).join(ARTIFACT_FILE)
}

/// Write the analysis to `path`, creating parent directories as needed.
pub fn write_analysis(analysis: &ProjectAnalysis, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = analysis.to_json().map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a previously written analysis.
pub fn load_analysis(path: &Path) -> Result<ProjectAnalysis> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_index() -> ProjectIndex {
        let mut widget = FileRecord::new(Path::new("pkg/a.py"));
        widget.classes.push(
            ClassInfo::new("Widget")
                .with_methods(["render"])
                .with_docstring("Draws ünïcode widgets."),
        );
        widget.imports.push("os".to_string());

        let mut main = FileRecord::new(Path::new("main.py"));
        main.functions.push(FunctionInfo::new("main"));
        main.imports.push("pkg.a".to_string());

        ProjectIndex::from_records(2, vec![widget, main])
    }

    fn sample_analysis() -> ProjectAnalysis {
        let index = sample_index();
        let graph = DependencyGraph::build(&index);
        ProjectAnalysis::assemble(Path::new("/work/demo"), &index, graph, vec!["main".into()])
    }

    #[test]
    fn test_default_artifact_path() {
        assert_eq!(
            default_artifact_path(Path::new("/work/demo")),
            PathBuf::from("/work/demo/.claude/project_analysis.json")
        );
    }

    #[test]
    fn test_document_shape() {
        let analysis = sample_analysis();
        let json = serde_json::to_value(&analysis).unwrap();

        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "entry_points",
                "files",
                "imports_graph",
                "modules",
                "project_root",
                "total_files"
            ]
        );
        assert_eq!(json["project_root"], "/work/demo");
        assert_eq!(json["total_files"], 2);
        assert_eq!(json["imports_graph"]["main"], serde_json::json!(["pkg.a"]));
        assert_eq!(json["modules"]["pkg.a"]["path"], "pkg/a.py");
        assert!(json["modules"]["pkg.a"].get("module").is_none());
        assert_eq!(json["files"][1]["module"], "main");
        assert!(json["files"][1]["functions"][0]["docstring"].is_null());
    }

    #[test]
    fn test_counts() {
        let analysis = sample_analysis();
        assert_eq!(analysis.class_count(), 1);
        assert_eq!(analysis.function_count(), 1);
    }

    #[test]
    fn test_write_creates_parent_and_keeps_unicode() {
        let dir = tempdir().unwrap();
        let path = default_artifact_path(dir.path());
        let analysis = sample_analysis();

        write_analysis(&analysis, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("ünïcode"));
        assert!(text.contains("\n  \"project_root\""));

        let loaded = load_analysis(&path).unwrap();
        assert_eq!(loaded, analysis);
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_analysis(&sample_analysis(), &blocker.join("out.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_invalid_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"project_root\": 1}").unwrap();

        let err = load_analysis(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
