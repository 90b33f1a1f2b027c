//! Language Parser Module
//!
//! Tree-sitter based extraction of documentable declarations.
//!
//! ## Parser Factory
//!
//! Use `create_parser` to create a parser for a given language:
//!
//! ```rust,ignore
//! use docsmith::analyzer::parser::{Language, create_parser};
//!
//! let parser = create_parser(Language::TypeScript)?;
//! let result = parser.parse("src/math.ts", content)?;
//! ```

pub mod language;
pub mod traits;
pub mod typescript;

pub use language::Language;
pub use traits::{
    ParseResult, Parser, collapse_whitespace, create_ts_parser, first_syntax_error,
    get_node_text, node_lines,
};
pub use typescript::TypeScriptParser;

use crate::types::Result;
use std::path::Path;
use std::sync::Arc;

/// Shared parser for thread-safe access
pub type SharedParser = Arc<dyn Parser>;

/// Create a parser for the given language.
pub fn create_parser(language: Language) -> Result<Box<dyn Parser>> {
    match language {
        Language::TypeScript | Language::Tsx | Language::JavaScript | Language::Jsx => {
            Ok(Box::new(TypeScriptParser::new(language)?))
        }
    }
}

/// Create a shared parser for concurrent access.
pub fn create_shared_parser(language: Language) -> Result<SharedParser> {
    let parser = create_parser(language)?;
    Ok(Arc::from(parser))
}

/// Try to create a parser for a file path.
///
/// Returns None if the extension is not one the extractor understands.
pub fn create_parser_for_path<P: AsRef<Path>>(path: P) -> Option<Box<dyn Parser>> {
    let language = Language::from_path(path)?;
    match create_parser(language) {
        Ok(parser) => Some(parser),
        Err(e) => {
            tracing::warn!("Failed to create {} parser: {}", language, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_parser_typescript() {
        let parser = create_parser(Language::TypeScript);
        assert!(parser.is_ok());
        assert_eq!(parser.unwrap().language(), Language::TypeScript);
    }

    #[test]
    fn test_create_parser_for_path() {
        let parser = create_parser_for_path("src/App.tsx");
        assert_eq!(parser.unwrap().language(), Language::Tsx);

        let parser = create_parser_for_path("unknown.xyz");
        assert!(parser.is_none());
    }

    #[test]
    fn test_create_shared_parser() {
        let parser = create_shared_parser(Language::JavaScript);
        assert!(parser.is_ok());
    }
}
