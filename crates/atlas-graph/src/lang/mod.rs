//! Language-specific extractors.
//!
//! Each language module turns a parsed syntax tree into a
//! [`FileRecord`](crate::symbols::FileRecord).

pub mod python;

pub use python::{NodeKind, PythonExtractor};
