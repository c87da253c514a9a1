//! Python declaration extraction using tree-sitter.
//!
//! Walks a parsed module breadth first (the same order as Python's
//! `ast.walk`) and collects module-scope classes with their methods,
//! module-level functions, and every imported name. tree-sitter wraps
//! statements in extra nodes (blocks, clauses, decorators), so the walk
//! skips over those to keep Python's nesting depths.

use std::collections::{HashSet, VecDeque};

use tree_sitter::{Node, Tree};

use crate::symbols::{ClassInfo, FileRecord, FunctionInfo};

/// Syntax node kinds the extractor dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    ClassDefinition,
    FunctionDefinition,
    DecoratedDefinition,
    ImportStatement,
    ImportFromStatement,
    FutureImportStatement,
    ExpressionStatement,
    Comment,
    Other,
}

impl NodeKind {
    /// Classify a tree-sitter node.
    pub fn of(node: &Node) -> Self {
        match node.kind() {
            "module" => NodeKind::Module,
            "class_definition" => NodeKind::ClassDefinition,
            "function_definition" => NodeKind::FunctionDefinition,
            "decorated_definition" => NodeKind::DecoratedDefinition,
            "import_statement" => NodeKind::ImportStatement,
            "import_from_statement" => NodeKind::ImportFromStatement,
            "future_import_statement" => NodeKind::FutureImportStatement,
            "expression_statement" => NodeKind::ExpressionStatement,
            "comment" => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }

    /// Definitions open a new scope; anything below them is not module scope.
    fn opens_scope(&self) -> bool {
        matches!(self, NodeKind::ClassDefinition | NodeKind::FunctionDefinition)
    }
}

/// One pending node of the walk.
///
/// `branches` holds the `elif`/`else` clauses that follow an `elif_clause`;
/// Python nests them inside that branch rather than beside it.
struct WalkItem<'t> {
    node: Node<'t>,
    branches: Vec<Node<'t>>,
    /// Inside a class or function body.
    nested: bool,
}

/// Python-specific declaration extractor.
pub struct PythonExtractor;

impl PythonExtractor {
    /// Extract the declaration record for one parsed file.
    ///
    /// `record` arrives with its path and module name set; classes,
    /// functions and imports are appended in walk order.
    pub fn extract(tree: &Tree, source: &str, mut record: FileRecord) -> FileRecord {
        let root = tree.root_node();
        let top_level = Self::top_level_functions(root);

        let mut queue = VecDeque::from([WalkItem {
            node: root,
            branches: Vec::new(),
            nested: false,
        }]);

        while let Some(item) = queue.pop_front() {
            let node = item.node;
            let kind = NodeKind::of(&node);

            match kind {
                NodeKind::ClassDefinition if !item.nested => {
                    if let Some(class) = Self::class_info(node, source) {
                        record.classes.push(class);
                    }
                }
                NodeKind::FunctionDefinition if top_level.contains(&node.id()) => {
                    if let Some(name) = Self::definition_name(node, source) {
                        let mut function = FunctionInfo::new(name);
                        function.docstring = Self::body_docstring(node, source);
                        record.functions.push(function);
                    }
                }
                NodeKind::ImportStatement
                | NodeKind::ImportFromStatement
                | NodeKind::FutureImportStatement => {
                    record.imports.extend(Self::import_names(node, source));
                }
                _ => {}
            }

            let nested = item.nested || kind.opens_scope();
            let mut children = Vec::new();
            Self::syntax_children(node, &item.branches, &mut children);
            queue.extend(
                children
                    .into_iter()
                    .map(|(node, branches)| WalkItem {
                        node,
                        branches,
                        nested,
                    }),
            );
        }

        record
    }

    /// Children of `node` at the nesting depth Python's own syntax tree
    /// gives them.
    ///
    /// Blocks, `else`/`finally` clauses and decorator wrappers add no depth.
    /// Each `elif` becomes a level of its own holding the branches after it.
    fn syntax_children<'t>(
        node: Node<'t>,
        branches: &[Node<'t>],
        out: &mut Vec<(Node<'t>, Vec<Node<'t>>)>,
    ) {
        let mut cursor = node.walk();
        match node.kind() {
            "if_statement" | "elif_clause" => {
                let mut alternatives = Vec::new();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "elif_clause" | "else_clause" => alternatives.push(child),
                        _ => Self::push_flattened(child, out),
                    }
                }
                alternatives.extend_from_slice(branches);

                match alternatives.split_first() {
                    Some((first, rest)) if first.kind() == "elif_clause" => {
                        out.push((*first, rest.to_vec()));
                    }
                    Some((first, _)) => Self::push_flattened(*first, out),
                    None => {}
                }
            }
            _ => {
                for child in node.named_children(&mut cursor) {
                    Self::push_flattened(child, out);
                }
            }
        }
    }

    fn push_flattened<'t>(node: Node<'t>, out: &mut Vec<(Node<'t>, Vec<Node<'t>>)>) {
        match node.kind() {
            "block" | "else_clause" | "finally_clause" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    Self::push_flattened(child, out);
                }
            }
            // Decorators are expressions and hold no statements
            "decorated_definition" => {
                if let Some(def) = Self::decorated_target(node) {
                    out.push((def, Vec::new()));
                }
            }
            _ => out.push((node, Vec::new())),
        }
    }

    /// Ids of synchronous function definitions that are direct statements
    /// of the module body, either bare or wrapped in a decorator.
    fn top_level_functions(root: Node) -> HashSet<usize> {
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter_map(Self::plain_function)
            .map(|def| def.id())
            .collect()
    }

    /// The `def` behind a statement, if it is a plain or decorated
    /// synchronous function. `async def` is not collected.
    fn plain_function(stmt: Node) -> Option<Node> {
        let def = match NodeKind::of(&stmt) {
            NodeKind::FunctionDefinition => Some(stmt),
            NodeKind::DecoratedDefinition => Self::decorated_target(stmt),
            _ => None,
        }?;
        let is_async = def.child(0).is_some_and(|token| token.kind() == "async");
        (NodeKind::of(&def) == NodeKind::FunctionDefinition && !is_async).then_some(def)
    }

    fn class_info(node: Node, source: &str) -> Option<ClassInfo> {
        let name = Self::definition_name(node, source)?;
        let mut class = ClassInfo::new(name);

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for stmt in body.named_children(&mut cursor) {
                if let Some(method) =
                    Self::plain_function(stmt).and_then(|def| Self::definition_name(def, source))
                {
                    class.methods.push(method);
                }
            }
        }

        class.docstring = Self::body_docstring(node, source);
        Some(class)
    }

    fn decorated_target(node: Node) -> Option<Node> {
        node.child_by_field_name("definition")
    }

    fn definition_name(node: Node, source: &str) -> Option<String> {
        node.child_by_field_name("name")
            .map(|name| Self::node_text(&name, source))
    }

    /// Names contributed by one import statement.
    ///
    /// `import a.b as c` yields `a.b`; `from x import y` yields `y`;
    /// relative forms keep their dots (`from .. import y` yields `..y`).
    fn import_names(node: Node, source: &str) -> Vec<String> {
        let prefix = match NodeKind::of(&node) {
            NodeKind::ImportFromStatement => node
                .child_by_field_name("module_name")
                .filter(|module| module.kind() == "relative_import")
                .map(|module| Self::relative_prefix(module, source))
                .unwrap_or_default(),
            _ => String::new(),
        };

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            let target = if child.kind() == "aliased_import" {
                child.child_by_field_name("name")
            } else {
                Some(child)
            };
            if let Some(target) = target {
                names.push(format!("{}{}", prefix, Self::node_text(&target, source)));
            }
        }

        let mut cursor = node.walk();
        if node
            .named_children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import")
        {
            names.push(format!("{prefix}*"));
        }

        names
    }

    /// The leading dots of a relative module reference.
    fn relative_prefix(module: Node, source: &str) -> String {
        let mut cursor = module.walk();
        module
            .children(&mut cursor)
            .find(|child| child.kind() == "import_prefix")
            .map(|prefix| Self::node_text(&prefix, source))
            .unwrap_or_else(|| ".".to_string())
    }

    /// Docstring of a class or function definition.
    fn body_docstring(node: Node, source: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| NodeKind::of(child) != NodeKind::Comment)?;

        if NodeKind::of(&first) != NodeKind::ExpressionStatement || first.named_child_count() != 1 {
            return None;
        }
        let expr = first.named_child(0)?;
        let raw = match expr.kind() {
            "string" => decode_string_literal(&Self::node_text(&expr, source))?,
            "concatenated_string" => {
                let mut cursor = expr.walk();
                let mut text = String::new();
                for part in expr.named_children(&mut cursor) {
                    if part.kind() != "string" {
                        continue;
                    }
                    text.push_str(&decode_string_literal(&Self::node_text(&part, source))?);
                }
                text
            }
            _ => return None,
        };

        Some(clean_docstring(&raw))
    }

    fn node_text(node: &Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }
}

/// Decode a Python string literal to its value.
///
/// Returns `None` for bytes and f-strings, which never count as docstrings.
fn decode_string_literal(literal: &str) -> Option<String> {
    let prefix_len = literal
        .find(|c: char| c == '"' || c == '\'')
        .unwrap_or(literal.len());
    let prefix = literal[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') || prefix.contains('t') {
        return None;
    }

    let rest = &literal[prefix_len..];
    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| rest.starts_with(q) && rest.len() >= 2 * q.len() && rest.ends_with(q))?;
    let body = &rest[quote.len()..rest.len() - quote.len()];

    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Process backslash escapes in a non-raw string body.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.next_if(|d| ('0'..='7').contains(d)) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut digits = String::new();
                while digits.len() < width {
                    match chars.next_if(char::is_ascii_hexdigit) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(next);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                // Unknown escapes (including \N{...}) are kept verbatim
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

/// Clean a docstring the way `inspect.cleandoc` does.
///
/// Tabs are expanded, the first line is left-stripped, the common
/// indentation of the remaining lines is removed, and leading and
/// trailing blank lines are dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded: Vec<String> = raw.split('\n').map(expand_tabs).collect();

    let margin = expanded
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start();
            (!content.is_empty()).then(|| line.chars().count() - content.chars().count())
        })
        .min();

    let mut lines: Vec<String> = Vec::with_capacity(expanded.len());
    for (i, line) in expanded.into_iter().enumerate() {
        if i == 0 {
            lines.push(line.trim_start().to_string());
        } else if let Some(margin) = margin {
            lines.push(line.chars().skip(margin).collect());
        } else {
            lines.push(line);
        }
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    const TAB_SIZE: usize = 8;
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        match c {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}
