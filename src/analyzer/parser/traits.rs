use crate::types::{Declaration, DocsmithError, LineRange, Result};

/// Declarations extracted from one file, in document order
#[derive(Debug, Default)]
pub struct ParseResult {
    pub declarations: Vec<Declaration>,
}

impl ParseResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header ranges are pairwise disjoint
    pub fn headers_disjoint(&self) -> bool {
        self.declarations
            .windows(2)
            .all(|w| w[0].header.end <= w[1].header.start)
    }
}

pub trait Parser: Send + Sync {
    /// Extract documentable declarations. A syntax error anywhere in the file is
    /// an error: patching a misparsed file could corrupt it.
    fn parse(&self, path: &str, content: &str) -> Result<ParseResult>;
    fn language(&self) -> super::Language;
}

/// Extract text content from a tree-sitter node.
/// Returns empty string if extraction fails (with debug logging).
#[inline]
pub fn get_node_text<'a>(node: tree_sitter::Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        tracing::debug!(
            "UTF-8 extraction failed at {}:{}-{}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            node.end_position().row + 1,
            node.end_position().column,
            e
        );
        ""
    })
}

/// 1-based line range covered by a node
pub fn node_lines(node: tree_sitter::Node) -> LineRange {
    LineRange::new(
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

/// Create a tree-sitter parser for the given language.
pub fn create_ts_parser(
    language: &tree_sitter::Language,
    lang_name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(language)
        .map_err(|e| DocsmithError::Config(format!("Failed to set {} language: {}", lang_name, e)))?;
    Ok(parser)
}

/// Locate the first ERROR or MISSING node, depth first.
pub fn first_syntax_error(root: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if !root.has_error() {
        return None;
    }
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
    Some(root)
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
