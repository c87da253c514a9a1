//! Module dependency graph.
//!
//! Maps each module to the names it imports, excluding relative imports.
//! Targets are left unresolved: most point at external libraries rather
//! than modules in the index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::ProjectIndex;

/// Directed graph from module name to imported names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Derive the graph from the index's module mapping.
    pub fn build(index: &ProjectIndex) -> Self {
        let edges = index
            .modules()
            .map(|(name, record)| {
                let targets = record.absolute_imports().map(String::from).collect();
                (name.to_string(), targets)
            })
            .collect();
        Self { edges }
    }

    /// Out-edges of a module, if the module is in the graph.
    pub fn imports_of(&self, module: &str) -> Option<&[String]> {
        self.edges.get(module).map(Vec::as_slice)
    }

    /// Iterate over modules and their out-edges.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges
            .iter()
            .map(|(module, targets)| (module.as_str(), targets.as_slice()))
    }

    /// Total number of edges across all modules.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::FileRecord;
    use std::path::Path;

    fn record(path: &str, imports: &[&str]) -> FileRecord {
        let mut record = FileRecord::new(Path::new(path));
        record.imports = imports.iter().map(|s| s.to_string()).collect();
        record
    }

    #[test]
    fn test_build_excludes_relative_imports() {
        let index = ProjectIndex::from_records(
            2,
            vec![
                record("pkg/a.py", &["os", ".sibling", "json", "..Engine", "os"]),
                record("main.py", &["pkg.a"]),
            ],
        );

        let graph = DependencyGraph::build(&index);
        assert_eq!(graph.len(), 2);
        // Duplicates survive
        assert_eq!(graph.imports_of("pkg.a").unwrap(), ["os", "json", "os"]);
        assert_eq!(graph.imports_of("main").unwrap(), ["pkg.a"]);
        assert_eq!(graph.edge_count(), 4);
        assert!(
            graph
                .iter()
                .all(|(_, targets)| targets.iter().all(|t| !t.starts_with('.')))
        );
    }

    #[test]
    fn test_unresolved_targets_are_kept() {
        let index = ProjectIndex::from_records(1, vec![record("app.py", &["requests"])]);
        let graph = DependencyGraph::build(&index);
        assert_eq!(graph.imports_of("app").unwrap(), ["requests"]);
        assert!(graph.imports_of("requests").is_none());
    }

    #[test]
    fn test_module_without_imports_has_empty_edges() {
        let index = ProjectIndex::from_records(1, vec![record("lonely.py", &[])]);
        let graph = DependencyGraph::build(&index);
        assert!(graph.imports_of("lonely").unwrap().is_empty());
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let index = ProjectIndex::from_records(1, vec![record("main.py", &["os"])]);
        let graph = DependencyGraph::build(&index);
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json, serde_json::json!({"main": ["os"]}));
    }
}
