//! Unified diff parsing.
//!
//! Only the new side matters: added lines are changed lines, and a removal
//! with no replacement marks the new-side line just before it (line 1 at the
//! top of a file).

use std::sync::LazyLock;

use regex::Regex;

use super::{ChangeStatus, FileChange};
use crate::types::LineRange;

static HUNK_HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .map_err(|e| tracing::error!("Invalid hunk header pattern: {}", e))
        .ok()
});

/// New-side start line and line count from a hunk header
fn hunk_header(line: &str) -> Option<(u32, u32)> {
    let caps = HUNK_HEADER.as_ref()?.captures(line)?;
    let start = caps.get(3)?.as_str().parse().ok()?;
    let count = caps
        .get(4)
        .map(|m| m.as_str().parse().unwrap_or(1))
        .unwrap_or(1);
    Some((start, count))
}

/// Accumulates changed lines from hunk bodies
#[derive(Debug, Default)]
struct HunkWalker {
    in_hunk: bool,
    next_line: u32,
    /// Removed lines not followed by additions yet
    pending_removal: bool,
    changed: Vec<u32>,
}

impl HunkWalker {
    fn feed(&mut self, line: &str) {
        if let Some((start, count)) = hunk_header(line) {
            self.flush_removal();
            self.in_hunk = true;
            // An empty new side names the line before the change
            self.next_line = if count == 0 { start + 1 } else { start };
            return;
        }
        if !self.in_hunk {
            return;
        }
        match line.as_bytes().first() {
            Some(b'+') => {
                self.pending_removal = false;
                self.changed.push(self.next_line);
                self.next_line += 1;
            }
            Some(b'-') => self.pending_removal = true,
            // "\ No newline at end of file"
            Some(b'\\') => {}
            // Some producers drop the space on empty context lines
            Some(b' ') | None => {
                self.flush_removal();
                self.next_line += 1;
            }
            Some(_) => {
                self.flush_removal();
                self.in_hunk = false;
            }
        }
    }

    /// A pure removal marks the new-side line before it
    fn flush_removal(&mut self) {
        if std::mem::take(&mut self.pending_removal) {
            self.changed.push(self.next_line.saturating_sub(1).max(1));
        }
    }

    fn finish(mut self) -> Vec<LineRange> {
        self.flush_removal();
        coalesce(self.changed)
    }
}

/// Sorted, merged ranges from individual line numbers
pub fn coalesce(mut lines: Vec<u32>) -> Vec<LineRange> {
    lines.sort_unstable();
    lines.dedup();
    let mut ranges: Vec<LineRange> = Vec::new();
    for line in lines {
        match ranges.last_mut() {
            Some(last) if last.end + 1 == line => last.end = line,
            _ => ranges.push(LineRange::single(line)),
        }
    }
    ranges
}

/// Changed lines of one file's patch (GitHub's `patch` field).
pub fn parse_patch(patch: &str) -> Vec<LineRange> {
    let mut walker = HunkWalker::default();
    for line in patch.lines() {
        walker.feed(line);
    }
    walker.finish()
}

/// Parse the output of `git diff` covering any number of files.
pub fn parse_git_diff(output: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut current: Option<(FileChange, HunkWalker)> = None;

    let flush = |current: &mut Option<(FileChange, HunkWalker)>, changes: &mut Vec<FileChange>| {
        if let Some((mut change, walker)) = current.take() {
            change.ranges = walker.finish();
            changes.push(change);
        }
    };

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush(&mut current, &mut changes);
            let path = rest
                .rsplit_once(" b/")
                .map(|(_, b)| b.to_string())
                .unwrap_or_default();
            current = Some((
                FileChange {
                    path,
                    previous_path: None,
                    status: ChangeStatus::Modified,
                    ranges: Vec::new(),
                },
                HunkWalker::default(),
            ));
            continue;
        }

        let Some((change, walker)) = current.as_mut() else {
            continue;
        };

        if walker.in_hunk || line.starts_with("@@") {
            walker.feed(line);
            if walker.in_hunk {
                continue;
            }
        }

        if line.starts_with("new file mode") {
            change.status = ChangeStatus::Added;
        } else if line.starts_with("deleted file mode") {
            change.status = ChangeStatus::Removed;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            change.status = ChangeStatus::Renamed;
            change.previous_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("rename to ") {
            change.path = to.to_string();
        } else if let Some(from) = line.strip_prefix("copy from ") {
            change.status = ChangeStatus::Copied;
            change.previous_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("copy to ") {
            change.path = to.to_string();
        } else if let Some(path) = line.strip_prefix("+++ b/") {
            change.path = path.to_string();
        } else if line == "+++ /dev/null" {
            change.status = ChangeStatus::Removed;
        }
    }
    flush(&mut current, &mut changes);
    changes
}
