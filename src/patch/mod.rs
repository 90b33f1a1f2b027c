//! Patch Writer
//!
//! Converts generated text into documentation comments and splices them into
//! the original file text.
//!
//! - `Generate`: a new block goes at the start of the anchor line, indented
//!   like that line. When other code precedes the anchor on its line, a
//!   single-line comment is inserted right before the anchor instead.
//! - `Regenerate`: the existing comment's exact bytes are replaced.

pub mod comment;
pub mod diff;
pub mod writer;

pub use comment::CommentFormatter;
pub use writer::{Edit, PatchSet};

use crate::analyzer::VerdictKind;
use crate::types::{Declaration, LineIndex, Result, SourceFile, indentation_at};

/// Generated text for one declaration
#[derive(Debug, Clone)]
pub struct DocText<'a> {
    pub index: usize,
    pub verdict: VerdictKind,
    pub text: &'a str,
}

/// Build one edit per generated text.
///
/// `Skip` entries and entries whose verdict disagrees with the declaration's
/// comment state produce nothing.
pub fn plan_edits(
    source: &SourceFile,
    declarations: &[Declaration],
    docs: &[DocText<'_>],
    formatter: &CommentFormatter,
) -> Vec<Edit> {
    let text = source.text();
    let index = LineIndex::new(text);
    let eol = source.line_ending().as_str();

    docs.iter()
        .filter_map(|doc| {
            let decl = declarations.get(doc.index)?;
            match (doc.verdict, &decl.doc) {
                (VerdictKind::Skip, _) => None,
                (VerdictKind::Regenerate, Some(existing)) => {
                    let indent = indentation_at(text, &index, existing.bytes.start);
                    Some(Edit::replace(
                        existing.bytes.clone(),
                        formatter.block(doc.text, indent, eol),
                    ))
                }
                (VerdictKind::Generate, None) => {
                    let line_start = index.line_start(decl.anchor);
                    let lead = &text[line_start..decl.anchor];
                    if lead.trim().is_empty() {
                        let mut block = String::from(lead);
                        block.push_str(&formatter.block(doc.text, lead, eol));
                        block.push_str(eol);
                        Some(Edit::insert(line_start, block))
                    } else {
                        Some(Edit::insert(decl.anchor, formatter.inline(doc.text)))
                    }
                }
                (verdict, existing) => {
                    tracing::warn!(
                        "Skipping {} in {}: verdict {} but documented = {}",
                        decl.qualified_name,
                        source.relative_path,
                        verdict,
                        existing.is_some()
                    );
                    None
                }
            }
        })
        .collect()
}

/// Validate and apply `edits`, returning the patch set and the new file.
pub fn apply_edits(source: &SourceFile, edits: Vec<Edit>) -> Result<(PatchSet, SourceFile)> {
    let set = PatchSet::new(&source.relative_path, source.text(), edits)?;
    let patched = set.apply(source.text())?;
    Ok((set, source.with_text(patched)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::{Language, Parser, TypeScriptParser};
    use crate::analyzer::{FileScope, analyze};

    fn parse(content: &str) -> Vec<Declaration> {
        TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("math.ts", content)
            .unwrap()
            .declarations
    }

    fn patch_all(content: &str, text: &str) -> String {
        let source = SourceFile::new("/r/math.ts", "math.ts", content);
        let decls = parse(content);
        let verdicts = analyze(&decls, FileScope::Full, false);
        let docs: Vec<DocText> = verdicts
            .iter()
            .map(|v| DocText {
                index: v.index,
                verdict: v.kind,
                text,
            })
            .collect();
        let edits = plan_edits(&source, &decls, &docs, &CommentFormatter::default());
        apply_edits(&source, edits).unwrap().1.text().to_string()
    }

    #[test]
    fn test_scenario_add_sub() {
        let content = "function add(a, b) {\n  return a + b;\n}\n\n/** Subtracts. */\n\nfunction sub(a, b) {\n  return a - b;\n}\n";
        let patched = patch_all(content, "Adds two numbers.");

        assert_eq!(
            patched,
            format!("/**\n * Adds two numbers.\n */\n{}", content)
        );
        // original lines 5-8 are intact, shifted by the 3 inserted lines
        let original_tail: Vec<&str> = content.lines().skip(4).take(4).collect();
        let patched_tail: Vec<&str> = patched.lines().skip(7).take(4).collect();
        assert_eq!(original_tail, patched_tail);
    }

    #[test]
    fn test_indented_method_and_crlf() {
        let content = "class A {\r\n    run() {}\r\n}\r\n";
        let patched = patch_all(content, "Runs.");
        assert_eq!(
            patched,
            "/**\r\n * Runs.\r\n */\r\nclass A {\r\n    /**\r\n     * Runs.\r\n     */\r\n    run() {}\r\n}\r\n"
        );
    }

    #[test]
    fn test_inline_when_anchor_shares_line() {
        let content = "const a = 1; function f() {}\n";
        let patched = patch_all(content, "Does f.");
        assert_eq!(patched, "const a = 1; /** Does f. */ function f() {}\n");
    }

    #[test]
    fn test_regenerate_replaces_exact_bytes() {
        let content = "  /**\n   * Old.\n   */\n  function f() {}\n";
        let source = SourceFile::new("/r/a.ts", "a.ts", content);
        let decls = parse(content);
        let docs = [DocText {
            index: 0,
            verdict: VerdictKind::Regenerate,
            text: "New.",
        }];
        let edits = plan_edits(&source, &decls, &docs, &CommentFormatter::default());
        let (set, patched) = apply_edits(&source, edits).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(patched.text(), "  /**\n   * New.\n   */\n  function f() {}\n");
    }

    #[test]
    fn test_second_run_is_noop() {
        let content = "export class Store {\n  get(key: string) {\n    return key;\n  }\n}\n";
        let once = patch_all(content, "Documented.");
        let twice = patch_all(&once, "Documented.");
        assert_eq!(once, twice);
    }
}
