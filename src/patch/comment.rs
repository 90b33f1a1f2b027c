//! Documentation comment rendering.

use crate::constants::patch::DEFAULT_WRAP_WIDTH;

/// Narrowest text column wrapping will produce
const MIN_TEXT_WIDTH: usize = 20;

/// Formats validated text as a JSDoc block
#[derive(Debug, Clone, Copy)]
pub struct CommentFormatter {
    wrap_width: usize,
}

impl Default for CommentFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_WRAP_WIDTH)
    }
}

impl CommentFormatter {
    pub fn new(wrap_width: usize) -> Self {
        Self { wrap_width }
    }

    /// Multi-line block. The first line carries no indentation (the caller
    /// places it); following lines start with `indent`.
    ///
    /// ```text
    /// /**
    ///  * Adds two numbers.
    ///  *
    ///  * @param a - first addend
    ///  */
    /// ```
    pub fn block(&self, text: &str, indent: &str, eol: &str) -> String {
        let width = self
            .wrap_width
            .saturating_sub(indent.chars().count() + 3)
            .max(MIN_TEXT_WIDTH);

        let mut out = String::from("/**");
        for line in self.body_lines(text, width) {
            out.push_str(eol);
            out.push_str(indent);
            if line.is_empty() {
                out.push_str(" *");
            } else {
                out.push_str(" * ");
                out.push_str(&line);
            }
        }
        out.push_str(eol);
        out.push_str(indent);
        out.push_str(" */");
        out
    }

    /// Single-line form for declarations that share a line with other code
    pub fn inline(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("/** {} */ ", collapsed)
    }

    fn body_lines(&self, text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut in_fence = false;

        for raw in text.lines() {
            let line = raw.trim_end();
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                lines.push(line.to_string());
                continue;
            }
            if in_fence {
                lines.push(line.to_string());
            } else if line.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(wrap_words(line.trim(), width));
            }
        }
        lines
    }
}

/// Greedy word wrap. Words longer than `width` stay on their own line.
fn wrap_words(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout() {
        let formatter = CommentFormatter::default();
        let block = formatter.block("Adds two numbers.\n\n@param a - first", "  ", "\n");
        assert_eq!(
            block,
            "/**\n   * Adds two numbers.\n   *\n   * @param a - first\n   */"
        );
    }

    #[test]
    fn test_wraps_long_lines() {
        let formatter = CommentFormatter::new(30);
        let block = formatter.block(
            "one two three four five six seven eight nine ten eleven",
            "",
            "\n",
        );
        for line in block.lines() {
            assert!(line.chars().count() <= 30, "line too long: {:?}", line);
        }
        assert!(block.contains(" * one two three four five six"));
    }

    #[test]
    fn test_fenced_blocks_verbatim() {
        let formatter = CommentFormatter::new(30);
        let text = "Example:\n\n```ts\nconst value = compute(alpha, beta, gamma, delta);\n```";
        let block = formatter.block(text, "", "\n");
        assert!(block.contains(" * const value = compute(alpha, beta, gamma, delta);"));
    }

    #[test]
    fn test_crlf_and_inline() {
        let formatter = CommentFormatter::default();
        assert_eq!(formatter.block("Hi.", "", "\r\n"), "/**\r\n * Hi.\r\n */");
        assert_eq!(formatter.inline("Adds\n two."), "/** Adds two. */ ");
    }
}
