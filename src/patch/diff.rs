//! Unified diff rendering for dry runs.
//!
//! Hunks are derived from the patch set's own edit ranges instead of a
//! general line-diff algorithm: every edit is widened to whole lines, nearby
//! edits are merged, and context lines are taken from the original text.

use std::ops::Range;

use super::writer::{Edit, PatchSet};
use crate::types::{LineIndex, Result};

impl PatchSet {
    /// Render a `git diff`-style view of this patch set.
    pub fn unified_diff(&self, original: &str, context: u32) -> Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        // Surfaces a stale original before slicing it
        self.apply(original)?;

        let index = LineIndex::new(original);
        let mut out = format!("--- a/{}\n+++ b/{}\n", self.path(), self.path());
        let mut line_delta: i64 = 0;

        for cluster in clusters(self.edits(), original, &index, context) {
            let old_start_line = index.line_of(cluster.span.start).saturating_sub(context).max(1);
            let ctx_start = index.line_span(old_start_line).start.min(cluster.span.start);
            let ctx_end = context_end(original, cluster.span.end, context);

            let before = &original[ctx_start..cluster.span.start];
            let mut body = String::new();
            let mut old_count = count_lines(before);
            let mut new_count = old_count;
            let mut cursor = cluster.span.start;

            for segment in &cluster.segments {
                let gap = &original[cursor..segment.span.start];
                old_count += count_lines(gap);
                new_count += count_lines(gap);
                push_lines(&mut body, ' ', gap, false);

                let at_eof = segment.span.end == original.len();
                let removed = &original[segment.span.clone()];
                let added = splice(original, &segment.span, &segment.edits);
                old_count += count_lines(removed);
                new_count += count_lines(&added);
                push_lines(&mut body, '-', removed, at_eof);
                push_lines(&mut body, '+', &added, at_eof);
                cursor = segment.span.end;
            }

            let after = &original[cursor..ctx_end];
            old_count += count_lines(after);
            new_count += count_lines(after);
            push_lines(&mut body, ' ', after, ctx_end == original.len());

            let old_start = old_start_line as i64;
            let new_start = old_start + line_delta;
            line_delta += new_count as i64 - old_count as i64;

            out.push_str(&format!(
                "@@ -{} +{} @@\n",
                hunk_range(old_start, old_count),
                hunk_range(new_start, new_count)
            ));
            out.push_str(&body);
        }

        Ok(out)
    }
}

/// Edits whose widened line spans overlap
struct Segment<'e> {
    span: Range<usize>,
    edits: Vec<&'e Edit>,
}

/// Segments close enough to share a hunk; the lines between them are context
struct Cluster<'e> {
    span: Range<usize>,
    segments: Vec<Segment<'e>>,
}

fn clusters<'e>(
    edits: &'e [Edit],
    original: &str,
    index: &LineIndex,
    context: u32,
) -> Vec<Cluster<'e>> {
    let mut out: Vec<Cluster<'e>> = Vec::new();
    for edit in edits {
        let span = widen(edit, original, index);
        if let Some(last) = out.last_mut() {
            if let Some(segment) = last.segments.last_mut()
                && span.start < segment.span.end
            {
                segment.span.end = segment.span.end.max(span.end);
                segment.edits.push(edit);
                last.span.end = last.span.end.max(span.end);
                continue;
            }
            let gap = count_lines(&original[last.span.end..span.start]);
            if gap <= 2 * context as usize {
                last.span.end = last.span.end.max(span.end);
                last.segments.push(Segment {
                    span,
                    edits: vec![edit],
                });
                continue;
            }
        }
        out.push(Cluster {
            span: span.clone(),
            segments: vec![Segment {
                span,
                edits: vec![edit],
            }],
        });
    }
    out
}

/// Expand an edit to the whole lines it touches. An insertion at a line
/// start touches no existing line.
fn widen(edit: &Edit, original: &str, index: &LineIndex) -> Range<usize> {
    let start = index.line_start(edit.range.start);
    if edit.is_insertion() && start == edit.range.start {
        return start..start;
    }
    let end = if edit.range.end > edit.range.start
        && original[..edit.range.end].ends_with('\n')
    {
        edit.range.end
    } else {
        match original[edit.range.end..].find('\n') {
            Some(pos) => edit.range.end + pos + 1,
            None => original.len(),
        }
    };
    start..end
}

/// Offset after up to `lines` complete lines following `from`
fn context_end(original: &str, from: usize, lines: u32) -> usize {
    let mut end = from;
    for _ in 0..lines {
        if end >= original.len() {
            break;
        }
        end = match original[end..].find('\n') {
            Some(pos) => end + pos + 1,
            None => original.len(),
        };
    }
    end
}

/// New text for `span` with the cluster's edits applied
fn splice(original: &str, span: &Range<usize>, edits: &[&Edit]) -> String {
    let mut out = String::new();
    let mut cursor = span.start;
    for edit in edits {
        out.push_str(&original[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&original[cursor..span.end]);
    out
}

fn count_lines(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

fn hunk_range(start: i64, count: usize) -> String {
    match count {
        0 => format!("{},0", (start - 1).max(0)),
        1 => start.to_string(),
        n => format!("{},{}", start, n),
    }
}

/// Emit `text` as diff lines. A final line without a line break at the end
/// of the file gets git's no-newline marker.
fn push_lines(out: &mut String, marker: char, text: &str, at_eof: bool) {
    for line in text.split_inclusive('\n') {
        out.push(marker);
        out.push_str(line.trim_end_matches(['\n', '\r']));
        out.push('\n');
    }
    if at_eof && !text.is_empty() && !text.ends_with('\n') {
        out.push_str("\\ No newline at end of file\n");
    }
}
