//! Module-keyed index over extracted file records.

use std::collections::BTreeMap;

use crate::symbols::FileRecord;

/// Aggregated view over every successfully analyzed file.
///
/// Holds the ordered list of records plus a module-name lookup into it.
/// When two files derive the same module name, the later one wins in the
/// lookup while both stay in [`files`](Self::files).
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    files: Vec<FileRecord>,
    modules: BTreeMap<String, usize>,
    total_files: usize,
}

impl ProjectIndex {
    /// Build the index from records in processing order.
    ///
    /// `total_files` is the number of files discovered, including any that
    /// were skipped and so have no record.
    pub fn from_records(total_files: usize, records: Vec<FileRecord>) -> Self {
        let mut modules = BTreeMap::new();
        for (position, record) in records.iter().enumerate() {
            if let Some(previous) = modules.insert(record.module.clone(), position) {
                tracing::warn!(
                    "Module name collision for '{}': {} replaces {}",
                    record.module,
                    record.path,
                    records[previous].path
                );
            }
        }

        Self {
            files: records,
            modules,
            total_files,
        }
    }

    /// All records in processing order, including overwritten ones.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Look up the record that owns a module name.
    pub fn module(&self, name: &str) -> Option<&FileRecord> {
        self.modules.get(name).map(|&i| &self.files[i])
    }

    /// Module names with their records, sorted by module name.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.modules
            .iter()
            .map(|(name, &i)| (name.as_str(), &self.files[i]))
    }

    /// Number of distinct module names.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of files discovered for this run.
    pub fn total_files(&self) -> usize {
        self.total_files
    }
}
