//! atlas-graph: structural analysis of Python projects
//!
//! This crate provides the analysis pipeline behind `atlas`:
//! - Source file discovery with directory exclusion
//! - Parsing via tree-sitter and declaration extraction
//! - A module-keyed project index
//! - Import dependency graph and entry-point detection
//! - The JSON analysis artifact consumed by documentation renderers

pub mod builder;
pub mod discover;
pub mod entry;
pub mod graph;
pub mod index;
pub mod lang;
pub mod parser;
pub mod store;
pub mod symbols;

pub use builder::{
    AnalysisRun, AnalysisStats, AnalyzeError, AnalyzerOptions, FileDiagnostic, ProjectAnalyzer,
};
pub use discover::{discover_files, DiscoveryConfig};
pub use entry::{DiskSource, EntryPointDetector, EntryPointRules, SourceCache, SourceText};
pub use graph::DependencyGraph;
pub use index::ProjectIndex;
pub use lang::python::{NodeKind, PythonExtractor};
pub use parser::{FailureKind, ParseError, ParsedFile, Parser};
pub use store::{
    default_artifact_path, load_analysis, write_analysis, ModuleEntry, ProjectAnalysis, StoreError,
};
pub use symbols::{module_name_for_path, ClassInfo, FileRecord, FunctionInfo};
