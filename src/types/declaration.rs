//! Documentable declarations extracted from a syntax tree.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::LineRange;

/// Closed set of declaration kinds that may carry a documentation comment.
///
/// Every consumer matches on this exhaustively; a new kind is a compile error
/// in the analyzer, prompt builder and patch writer until handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Function,
    Class,
    Method,
    Interface,
    TypeAlias,
    Const,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Function => "function",
            DeclarationKind::Class => "class",
            DeclarationKind::Method => "method",
            DeclarationKind::Interface => "interface",
            DeclarationKind::TypeAlias => "type",
            DeclarationKind::Const => "const",
        }
    }

    /// Kinds whose documentation describes parameters and a return value
    pub fn is_callable(&self) -> bool {
        match self {
            DeclarationKind::Function | DeclarationKind::Method => true,
            DeclarationKind::Class
            | DeclarationKind::Interface
            | DeclarationKind::TypeAlias
            | DeclarationKind::Const => false,
        }
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Header text with whitespace collapsed
    pub text: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub is_async: bool,
}

/// An existing `/** ... */` comment attached to a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocComment {
    pub bytes: Range<usize>,
    pub lines: LineRange,
    pub text: String,
}

impl DocComment {
    /// Comment body without delimiters and leading `*` gutters
    pub fn content(&self) -> String {
        let inner = self
            .text
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");
        inner
            .lines()
            .map(|l| {
                let l = l.trim();
                l.strip_prefix("* ")
                    .or_else(|| l.strip_prefix('*'))
                    .unwrap_or(l)
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Dotted nesting path, e.g. `Store.get`
    pub qualified_name: String,
    pub signature: Signature,
    pub exported: bool,
    /// Byte range of the header (declaration start up to its body)
    pub header: Range<usize>,
    pub header_lines: LineRange,
    pub body_lines: Option<LineRange>,
    /// Lines from the first decorator or keyword to the closing token
    pub span_lines: LineRange,
    /// Byte offset where a new documentation comment belongs
    pub anchor: usize,
    pub doc: Option<DocComment>,
    /// Index of the enclosing declaration in the same file
    pub parent: Option<usize>,
}

impl Declaration {
    pub fn is_documented(&self) -> bool {
        self.doc.is_some()
    }

    /// Lines owned by this declaration including its documentation comment
    pub fn full_lines(&self) -> LineRange {
        match &self.doc {
            Some(doc) => LineRange::new(
                doc.lines.start.min(self.span_lines.start),
                self.span_lines.end,
            ),
            None => self.span_lines,
        }
    }
}
