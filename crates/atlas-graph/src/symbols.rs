//! Declaration records extracted from Python source files.
//!
//! These types form the per-file structural summary: the classes and
//! module-level functions a file declares, plus the names it imports.
//! They serialize directly into the analysis artifact, so field names and
//! order are part of the output contract.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// A class declared at module scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// The class name (unique within its file, not globally).
    pub name: String,

    /// Names of methods declared directly in the class body, in source order.
    pub methods: Vec<String>,

    /// Cleaned docstring, if the body starts with one.
    pub docstring: Option<String>,
}

impl ClassInfo {
    /// Create a class record with no methods or docstring.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            docstring: None,
        }
    }

    /// Set the method names.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Set the docstring.
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }
}

/// A function declared directly in the module body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// The function name.
    pub name: String,

    /// Cleaned docstring, if the body starts with one.
    pub docstring: Option<String>,
}

impl FunctionInfo {
    /// Create a function record without a docstring.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docstring: None,
        }
    }
}

/// Marker that prefixes relative import names (`from . import x` -> `.x`).
pub const RELATIVE_IMPORT_MARKER: char = '.';

/// Returns true if an extracted import name was written in relative form.
pub fn is_relative_import(name: &str) -> bool {
    name.starts_with(RELATIVE_IMPORT_MARKER)
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the project root, `/`-separated.
    pub path: String,

    /// Dotted module name derived from `path`.
    pub module: String,

    /// Module-scope classes, in walk order.
    pub classes: Vec<ClassInfo>,

    /// Module-level functions, in walk order.
    pub functions: Vec<FunctionInfo>,

    /// Imported names, in walk order. Duplicates are kept.
    pub imports: Vec<String>,
}

impl FileRecord {
    /// Create an empty record for a relative path, deriving its module name.
    pub fn new(relative_path: &Path) -> Self {
        Self {
            path: display_path(relative_path),
            module: module_name_for_path(relative_path),
            classes: Vec::new(),
            functions: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Import names not written in relative form.
    pub fn absolute_imports(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .map(String::as_str)
            .filter(|name| !is_relative_import(name))
    }

    /// The final segment of the module name (`pkg.cli.main` -> `main`).
    pub fn module_stem(&self) -> &str {
        self.module.rsplit('.').next().unwrap_or(&self.module)
    }
}

/// Render a relative path with `/` separators regardless of platform.
pub fn display_path(relative_path: &Path) -> String {
    path_segments(relative_path).join("/")
}

/// Derive a dotted module name from a path relative to the project root.
///
/// The final extension is stripped and every path separator becomes `.`,
/// so `pkg/sub/a.py` maps to `pkg.sub.a` and `pkg/__init__.py` maps to
/// `pkg.__init__`.
pub fn module_name_for_path(relative_path: &Path) -> String {
    let mut segments = path_segments(relative_path);
    if let Some(last) = segments.last_mut() {
        if let Some(stem) = Path::new(last.as_str()).file_stem() {
            *last = stem.to_string_lossy().into_owned();
        }
    }
    segments.join(".")
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
