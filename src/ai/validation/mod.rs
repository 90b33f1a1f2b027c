//! Generated Text Validation
//!
//! Normalizes backend output into plain documentation text and rejects
//! anything that cannot be embedded in a block comment.
//!
//! ## Steps
//! 1. Normalize line endings and trim
//! 2. Strip a code fence wrapping the whole answer
//! 3. Unwrap a `/** ... */` block the backend added itself, and `*` gutters
//! 4. Reject empty text, comment delimiters, file-level tags and oversize answers

use std::fmt;

use crate::analyzer::parser::typescript::FILE_LEVEL_TAGS;

/// Why generated text was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Empty,
    /// `*/` or `/*` would break out of or nest inside the comment
    CommentDelimiter,
    /// `@module`, `@file` and friends would turn the comment into a file header
    FileLevelTag,
    TooLong,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty output"),
            RejectReason::CommentDelimiter => write!(f, "output contains a comment delimiter"),
            RejectReason::FileLevelTag => write!(f, "output contains a file-level tag"),
            RejectReason::TooLong => write!(f, "output exceeds length limit"),
        }
    }
}

/// Validates raw backend output
#[derive(Debug, Clone, Copy)]
pub struct DocTextValidator {
    max_chars: usize,
}

impl Default for DocTextValidator {
    fn default() -> Self {
        Self::new(crate::constants::generation::MAX_OUTPUT_CHARS)
    }
}

impl DocTextValidator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Clean `raw` into comment-safe text.
    pub fn process(&self, raw: &str) -> Result<String, RejectReason> {
        let normalized = raw.replace("\r\n", "\n");
        let mut text = strip_outer_fence(normalized.trim()).trim().to_string();

        if let Some(inner) = unwrap_block_comment(&text) {
            text = inner;
        }
        text = strip_gutters(&text);
        let text = tidy_lines(&text);

        if text.is_empty() {
            return Err(RejectReason::Empty);
        }
        if text.contains("*/") || text.contains("/*") {
            return Err(RejectReason::CommentDelimiter);
        }
        if FILE_LEVEL_TAGS.iter().any(|tag| text.contains(tag)) {
            return Err(RejectReason::FileLevelTag);
        }
        if text.chars().count() > self.max_chars {
            return Err(RejectReason::TooLong);
        }
        Ok(text)
    }
}

/// Remove a fence that wraps the entire answer, keeping inner fences
fn strip_outer_fence(text: &str) -> &str {
    if !text.starts_with("```") || !text.ends_with("```") || text.len() < 6 {
        return text;
    }
    let Some(first_newline) = text.find('\n') else {
        return text;
    };
    let inner = &text[first_newline + 1..text.len() - 3];
    inner.trim_end()
}

fn unwrap_block_comment(text: &str) -> Option<String> {
    let inner = text.strip_prefix("/**")?.strip_suffix("*/")?;
    Some(inner.trim().to_string())
}

/// Drop leading `*` gutters when every non-blank line carries one
fn strip_gutters(text: &str) -> String {
    let guttered = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .all(|l| l.trim_start().starts_with('*'));
    if !guttered {
        return text.to_string();
    }
    text.lines()
        .map(|l| {
            let l = l.trim_start();
            l.strip_prefix("* ")
                .or_else(|| l.strip_prefix('*'))
                .unwrap_or(l)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim line ends and collapse runs of blank lines
fn tidy_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(raw: &str) -> Result<String, RejectReason> {
        DocTextValidator::default().process(raw)
    }

    #[test]
    fn test_plain_text_passes() {
        assert_eq!(process("  Adds two numbers.\n").unwrap(), "Adds two numbers.");
    }

    #[test]
    fn test_strips_fence_and_comment_wrapper() {
        let raw = "```ts\n/**\n * Adds two numbers.\n *\n * @param a first\n */\n```";
        assert_eq!(process(raw).unwrap(), "Adds two numbers.\n\n@param a first");
    }

    #[test]
    fn test_keeps_inner_fences() {
        let raw = "Parses input.\n\n```ts\nparse(\"x\")\n```";
        assert_eq!(process(raw).unwrap(), raw);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(process("   "), Err(RejectReason::Empty));
        assert_eq!(process("```\n```"), Err(RejectReason::Empty));
        assert_eq!(process("Ends early */ oops"), Err(RejectReason::CommentDelimiter));
        assert_eq!(process("See /* note"), Err(RejectReason::CommentDelimiter));
        assert_eq!(
            process("Loads config.\n\n@module config"),
            Err(RejectReason::FileLevelTag)
        );
        assert_eq!(
            DocTextValidator::new(5).process("Too long text"),
            Err(RejectReason::TooLong)
        );
    }

    #[test]
    fn test_collapses_blank_runs_and_crlf() {
        assert_eq!(process("One.\r\n\r\n\r\nTwo.\r\n").unwrap(), "One.\n\nTwo.");
    }
}
