//! Source text values shared by every pipeline stage.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A loaded source file.
///
/// Never mutated after loading; patching produces a new value through
/// [`SourceFile::with_text`]. The text is reference-counted so generation jobs
/// can borrow context windows without copying the file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the repository root, `/`-separated
    pub relative_path: String,
    text: Arc<str>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            text: Arc::from(text),
        }
    }

    /// Read a file from disk, rejecting non UTF-8 content.
    pub fn load(root: &Path, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error())
        })?;
        Ok(Self::new(path, relative_path(root, path), &text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// New value for the same file with different content.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            path: self.path.clone(),
            relative_path: self.relative_path.clone(),
            text: Arc::from(text),
        }
    }

    pub fn line_ending(&self) -> LineEnding {
        LineEnding::detect(&self.text)
    }
}

/// Compute a `/`-separated path relative to `root`, falling back to the full path.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Line terminator used by a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(idx) if idx > 0 && text.as_bytes()[idx - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Inclusive, 1-based line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Build a range; a reversed pair is normalized.
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn intersects(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn intersection(&self, other: &LineRange) -> Option<LineRange> {
        self.intersects(other).then(|| LineRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// True if some line of `self` lies outside every range in `covered`.
    pub fn has_uncovered_line(&self, covered: &[LineRange]) -> bool {
        let mut sorted: Vec<LineRange> = covered
            .iter()
            .filter_map(|c| c.intersection(self))
            .collect();
        sorted.sort();

        let mut next = self.start;
        for c in sorted {
            if c.start > next {
                return true;
            }
            next = next.max(c.end.saturating_add(1));
            if next > self.end {
                return false;
            }
        }
        next <= self.end
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Byte offsets of line starts, for offset ↔ line conversion
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            len: text.len(),
        }
    }

    /// 1-based line containing `offset`
    pub fn line_of(&self, offset: usize) -> u32 {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx as u32 + 1,
            Err(idx) => idx as u32,
        }
    }

    /// Byte offset where the line containing `offset` starts
    pub fn line_start(&self, offset: usize) -> usize {
        let line = self.line_of(offset) as usize;
        self.starts[line - 1]
    }

    /// Byte range of a 1-based line, including its terminator
    pub fn line_span(&self, line: u32) -> Range<usize> {
        let idx = (line.max(1) as usize - 1).min(self.starts.len() - 1);
        let start = self.starts[idx];
        let end = self.starts.get(idx + 1).copied().unwrap_or(self.len);
        start..end
    }

    pub fn line_count(&self) -> u32 {
        self.starts.len() as u32
    }
}

/// Leading whitespace of the line containing `offset`
pub fn indentation_at<'a>(text: &'a str, index: &LineIndex, offset: usize) -> &'a str {
    let start = index.line_start(offset);
    let line = &text[start..offset.max(start)];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_range_intersects() {
        let a = LineRange::new(1, 5);
        assert!(a.intersects(&LineRange::new(5, 9)));
        assert!(!a.intersects(&LineRange::new(6, 9)));
        assert_eq!(LineRange::new(9, 3), LineRange::new(3, 9));
    }

    #[test]
    fn test_has_uncovered_line() {
        let body = LineRange::new(10, 20);
        assert!(body.has_uncovered_line(&[]));
        assert!(body.has_uncovered_line(&[LineRange::new(10, 15)]));
        assert!(!body.has_uncovered_line(&[LineRange::new(10, 15), LineRange::new(16, 20)]));
        assert!(!body.has_uncovered_line(&[LineRange::new(1, 30)]));
        assert!(body.has_uncovered_line(&[LineRange::new(10, 12), LineRange::new(14, 20)]));
    }

    #[test]
    fn test_line_index() {
        let text = "a\nbb\n\nccc";
        let index = LineIndex::new(text);
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
        assert_eq!(index.line_start(7), 6);
        assert_eq!(index.line_span(2), 2..5);
        assert_eq!(index.line_span(4), 6..9);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_indentation_and_line_ending() {
        let text = "class A {\n    foo() {}\n}\n";
        let index = LineIndex::new(text);
        let offset = text.find("foo").unwrap();
        assert_eq!(indentation_at(text, &index, offset), "    ");
        assert_eq!(LineEnding::detect(text), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/repo");
        assert_eq!(relative_path(root, Path::new("/repo/src/a.ts")), "src/a.ts");
    }
}
