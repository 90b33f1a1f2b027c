//! Code Analyzer Module
//!
//! - Source traversal with exclusion rules
//! - Declaration extraction (tree-sitter)
//! - Coverage verdicts for full and incremental runs

pub mod coverage;
pub mod parser;
pub mod scanner;

pub use coverage::{
    CoverageVerdict, FileScope, VerdictCounts, VerdictKind, VerdictReason, analyze, is_touched,
};
