//! Tree-sitter based Python parser.
//!
//! Wraps a tree-sitter parser configured with the Python grammar. Because
//! tree-sitter recovers from malformed input instead of failing, a tree
//! containing `ERROR` or `MISSING` nodes is reported as a syntax error so
//! callers can skip the file the way a strict parser would. The grammar
//! also accepts a few Python 2 statement forms that Python 3 rejects; those
//! are reported as syntax errors too.

use std::path::Path;

use thiserror::Error;
use tree_sitter::Node;

/// Errors that can occur while reading or parsing one source file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at line {line}, column {column}: {detail}")]
    Syntax {
        line: usize,
        column: usize,
        detail: String,
    },

    #[error("Failed to parse source code")]
    ParseFailed,

    #[error("Failed to set parser language: {0}")]
    LanguageError(String),
}

/// Coarse classification of a per-file failure, surfaced in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file does not parse under the Python grammar.
    Syntax,
    /// The file could not be opened or decoded.
    Io,
    /// Anything else (parser setup, cancelled parse).
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Syntax => "syntax error",
            FailureKind::Io => "read error",
            FailureKind::Other => "analysis error",
        }
    }
}

impl ParseError {
    /// The failure kind used when reporting a skipped file.
    pub fn kind(&self) -> FailureKind {
        match self {
            ParseError::Syntax { .. } => FailureKind::Syntax,
            ParseError::Io(_) => FailureKind::Io,
            ParseError::ParseFailed | ParseError::LanguageError(_) => FailureKind::Other,
        }
    }
}

/// A parsed source file with its syntax tree.
pub struct ParsedFile {
    /// The tree-sitter syntax tree.
    pub tree: tree_sitter::Tree,
    /// The source code (owned for lifetime management).
    pub source: String,
}

impl ParsedFile {
    /// Get the root node of the syntax tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

/// Python source parser.
pub struct Parser {
    ts_parser: tree_sitter::Parser,
}

impl Parser {
    /// Create a parser for the Python grammar.
    pub fn new() -> Result<Self, ParseError> {
        let mut ts_parser = tree_sitter::Parser::new();
        ts_parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParseError::LanguageError(e.to_string()))?;
        Ok(Self { ts_parser })
    }

    /// Read and parse a file from the filesystem.
    ///
    /// The file is read fully (and its handle released) before parsing.
    pub fn parse_file(&mut self, path: &Path) -> Result<ParsedFile, ParseError> {
        let source = std::fs::read_to_string(path)?;
        self.parse_source(source)
    }

    /// Parse source text, rejecting trees that contain syntax errors.
    pub fn parse_source(&mut self, source: impl Into<String>) -> Result<ParsedFile, ParseError> {
        let source = source.into();
        let tree = self
            .ts_parser
            .parse(&source, None)
            .ok_or(ParseError::ParseFailed)?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(syntax_error(root, &source));
        }
        if let Some((node, detail)) = first_legacy_construct(root) {
            let pos = node.start_position();
            return Err(ParseError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
                detail: detail.to_string(),
            });
        }

        Ok(ParsedFile { tree, source })
    }
}

/// Locate the first `ERROR` or `MISSING` node in document order.
fn first_error_node(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

/// Locate the first Python 2 only construct in document order.
fn first_legacy_construct(root: Node) -> Option<(Node, &'static str)> {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let detail = match node.kind() {
            "print_statement" => Some("missing parentheses in call to 'print'"),
            "exec_statement" => Some("missing parentheses in call to 'exec'"),
            "tuple_pattern"
                if node
                    .parent()
                    .is_some_and(|p| matches!(p.kind(), "parameters" | "lambda_parameters")) =>
            {
                Some("tuple parameter unpacking is not supported")
            }
            _ => None,
        };
        if let Some(detail) = detail {
            return Some((node, detail));
        }
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn syntax_error(root: Node, source: &str) -> ParseError {
    let Some(node) = first_error_node(root) else {
        return ParseError::Syntax {
            line: 1,
            column: 1,
            detail: "invalid syntax".to_string(),
        };
    };

    let pos = node.start_position();
    let detail = if node.is_missing() {
        format!("expected '{}'", node.kind())
    } else {
        let text = node.utf8_text(source.as_bytes()).unwrap_or("");
        match text.lines().next().map(str::trim) {
            Some(snippet) if !snippet.is_empty() => format!("invalid syntax near '{snippet}'"),
            _ => "invalid syntax".to_string(),
        }
    };

    ParseError::Syntax {
        line: pos.row + 1,
        column: pos.column + 1,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_source() {
        let mut parser = Parser::new().unwrap();
        let source = r#"
def hello():
    print("Hello, world!")

class Greeter:
    def greet(self, name):
        return f"Hello, {name}!"
"#;

        let parsed = parser.parse_source(source).unwrap();
        assert!(!parsed.root_node().has_error());
        assert_eq!(parsed.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_reports_syntax_error() {
        let mut parser = Parser::new().unwrap();
        let source = "import os\n\ndef broken(:\n    pass\n";

        let err = parser.parse_source(source).err().expect("should fail");
        assert_eq!(err.kind(), FailureKind::Syntax);
        match err {
            ParseError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_python2_forms() {
        let mut parser = Parser::new().unwrap();
        for (source, line) in [
            ("import sys\nprint \"hello\"\n", 2),
            ("exec \"x = 1\"\n", 1),
            ("def f(a, (b, c)):\n    pass\n", 1),
        ] {
            let err = parser.parse_source(source).err().expect("should fail");
            assert_eq!(err.kind(), FailureKind::Syntax, "{source:?}");
            match err {
                ParseError::Syntax { line: got, .. } => assert_eq!(got, line, "{source:?}"),
                other => panic!("expected syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_accepts_python3_print_and_tuple_targets() {
        let mut parser = Parser::new().unwrap();
        let source = "print(\"hello\")\nexec(\"x = 1\")\nfor (a, b) in pairs:\n    pass\nf = lambda a, b: a\n";
        assert!(parser.parse_source(source).is_ok());
    }

    #[test]
    fn test_parse_empty_source() {
        let mut parser = Parser::new().unwrap();
        let parsed = parser.parse_source("").unwrap();
        assert_eq!(parsed.root_node().named_child_count(), 0);
    }

    #[test]
    fn test_parse_file_missing() {
        let mut parser = Parser::new().unwrap();
        let err = parser
            .parse_file(Path::new("/definitely/not/here.py"))
            .err()
            .expect("should fail");
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn test_parse_file_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.py");
        std::fs::write(&path, [b'x', b' ', b'=', b' ', 0xff, b'\n']).unwrap();

        let mut parser = Parser::new().unwrap();
        let err = parser.parse_file(&path).err().expect("should fail");
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn test_parsed_file_node_text() {
        let mut parser = Parser::new().unwrap();
        let parsed = parser.parse_source("x = 1").unwrap();
        assert_eq!(parsed.node_text(parsed.root_node()), "x = 1");
    }
}
