//! Coverage Analysis
//!
//! Decides, per declaration, whether documentation must be generated,
//! regenerated or left alone. Verdicts depend only on the declarations, the
//! changed lines of the file (incremental runs) and whether the file is
//! excluded; nothing here touches the filesystem or the network.

use serde::Serialize;

use crate::types::{Declaration, LineRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Skip,
    Generate,
    Regenerate,
}

impl VerdictKind {
    pub fn needs_generation(&self) -> bool {
        !matches!(self, VerdictKind::Skip)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Skip => "skip",
            VerdictKind::Generate => "generate",
            VerdictKind::Regenerate => "regenerate",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// Full scan, comment present
    AlreadyDocumented,
    /// Generated definitions or a configured suffix
    ExcludedFile,
    /// Incremental run, no changed line hits the declaration
    Untouched,
    /// Incremental run, file has no changes
    FileNotInChangeSet,
    /// Full scan, no comment
    MissingDoc,
    TouchedUndocumented,
    TouchedStaleDoc,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::AlreadyDocumented => "already documented",
            VerdictReason::ExcludedFile => "excluded file",
            VerdictReason::Untouched => "not touched by change",
            VerdictReason::FileNotInChangeSet => "file not in change set",
            VerdictReason::MissingDoc => "missing documentation",
            VerdictReason::TouchedUndocumented => "changed, undocumented",
            VerdictReason::TouchedStaleDoc => "changed, documentation may be stale",
        }
    }
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for the declaration at `index` in its file's declaration list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageVerdict {
    pub index: usize,
    pub kind: VerdictKind,
    pub reason: VerdictReason,
}

impl CoverageVerdict {
    fn new(index: usize, kind: VerdictKind, reason: VerdictReason) -> Self {
        Self {
            index,
            kind,
            reason,
        }
    }
}

/// What the run knows about one file's changes
#[derive(Debug, Clone, Copy)]
pub enum FileScope<'a> {
    /// Full scan: every declaration is considered
    Full,
    /// Incremental run, new-side changed lines of this file
    Changed(&'a [LineRange]),
    /// Incremental run, file absent from the change set
    Unchanged,
}

/// Compute one verdict per declaration, in declaration order.
pub fn analyze(
    declarations: &[Declaration],
    scope: FileScope<'_>,
    excluded_file: bool,
) -> Vec<CoverageVerdict> {
    declarations
        .iter()
        .enumerate()
        .map(|(index, decl)| {
            if excluded_file {
                return CoverageVerdict::new(index, VerdictKind::Skip, VerdictReason::ExcludedFile);
            }
            match scope {
                FileScope::Full => {
                    if decl.is_documented() {
                        CoverageVerdict::new(
                            index,
                            VerdictKind::Skip,
                            VerdictReason::AlreadyDocumented,
                        )
                    } else {
                        CoverageVerdict::new(index, VerdictKind::Generate, VerdictReason::MissingDoc)
                    }
                }
                FileScope::Unchanged => CoverageVerdict::new(
                    index,
                    VerdictKind::Skip,
                    VerdictReason::FileNotInChangeSet,
                ),
                FileScope::Changed(changed) => {
                    if !is_touched(declarations, index, changed) {
                        CoverageVerdict::new(index, VerdictKind::Skip, VerdictReason::Untouched)
                    } else if decl.is_documented() {
                        CoverageVerdict::new(
                            index,
                            VerdictKind::Regenerate,
                            VerdictReason::TouchedStaleDoc,
                        )
                    } else {
                        CoverageVerdict::new(
                            index,
                            VerdictKind::Generate,
                            VerdictReason::TouchedUndocumented,
                        )
                    }
                }
            }
        })
        .collect()
}

/// A declaration is touched when a changed range hits its header (decorators
/// included), or hits its body on a line that no nested declaration owns.
/// Changes confined to the documentation comment do not count.
pub fn is_touched(declarations: &[Declaration], index: usize, changed: &[LineRange]) -> bool {
    let Some(decl) = declarations.get(index) else {
        return false;
    };

    let header = LineRange::new(decl.span_lines.start, decl.header_lines.end);
    let nested: Vec<LineRange> = declarations
        .iter()
        .filter(|d| d.parent == Some(index))
        .map(|d| d.full_lines())
        .collect();

    changed.iter().any(|range| {
        if range.intersects(&header) {
            return true;
        }
        decl.body_lines
            .and_then(|body| body.intersection(range))
            .map(|hit| hit.has_uncovered_line(&nested))
            .unwrap_or(false)
    })
}

/// Verdict counts for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub skip: usize,
    pub generate: usize,
    pub regenerate: usize,
}

impl VerdictCounts {
    pub fn from_verdicts(verdicts: &[CoverageVerdict]) -> Self {
        let mut counts = Self::default();
        for v in verdicts {
            counts.add(v.kind);
        }
        counts
    }

    pub fn add(&mut self, kind: VerdictKind) {
        match kind {
            VerdictKind::Skip => self.skip += 1,
            VerdictKind::Generate => self.generate += 1,
            VerdictKind::Regenerate => self.regenerate += 1,
        }
    }

    pub fn merge(&mut self, other: &VerdictCounts) {
        self.skip += other.skip;
        self.generate += other.generate;
        self.regenerate += other.regenerate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::{Language, Parser, TypeScriptParser};
    use crate::types::{DeclarationKind, DocComment, Signature};

    fn decl(span: (u32, u32), body: Option<(u32, u32)>, doc: Option<(u32, u32)>) -> Declaration {
        let header_end = body.map(|b| b.0).unwrap_or(span.1);
        Declaration {
            kind: DeclarationKind::Function,
            name: "f".to_string(),
            qualified_name: "f".to_string(),
            signature: Signature::default(),
            exported: false,
            header: 0..1,
            header_lines: LineRange::new(span.0, header_end),
            body_lines: body.map(|(s, e)| LineRange::new(s, e)),
            span_lines: LineRange::new(span.0, span.1),
            anchor: 0,
            doc: doc.map(|(s, e)| DocComment {
                bytes: 0..0,
                lines: LineRange::new(s, e),
                text: "/** x */".to_string(),
            }),
            parent: None,
        }
    }

    fn kinds(verdicts: &[CoverageVerdict]) -> Vec<VerdictKind> {
        verdicts.iter().map(|v| v.kind).collect()
    }

    const ADD_SUB: &str = "function add(a, b) {\n  return a + b;\n}\n\n/** Subtracts. */\n\nfunction sub(a, b) {\n  return a - b;\n}\n";

    fn add_sub() -> Vec<Declaration> {
        TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("math.ts", ADD_SUB)
            .unwrap()
            .declarations
    }

    #[test]
    fn test_full_scan_scenario() {
        let decls = add_sub();
        let verdicts = analyze(&decls, FileScope::Full, false);
        assert_eq!(kinds(&verdicts), vec![VerdictKind::Generate, VerdictKind::Skip]);
        assert_eq!(verdicts[1].reason, VerdictReason::AlreadyDocumented);
    }

    #[test]
    fn test_incremental_scenario() {
        let decls = add_sub();
        let changed = [LineRange::single(7)];
        let verdicts = analyze(&decls, FileScope::Changed(&changed), false);
        assert_eq!(kinds(&verdicts), vec![VerdictKind::Skip, VerdictKind::Regenerate]);
        assert_eq!(verdicts[0].reason, VerdictReason::Untouched);
    }

    #[test]
    fn test_incremental_scoping() {
        let decls = vec![decl((1, 5), Some((1, 5)), None), decl((9, 20), Some((9, 20)), None)];
        let changed = [LineRange::new(10, 12)];
        let verdicts = analyze(&decls, FileScope::Changed(&changed), false);
        assert_eq!(kinds(&verdicts), vec![VerdictKind::Skip, VerdictKind::Generate]);
    }

    #[test]
    fn test_doc_only_edit_does_not_touch() {
        let decls = add_sub();
        let changed = [LineRange::single(5)];
        let verdicts = analyze(&decls, FileScope::Changed(&changed), false);
        assert_eq!(kinds(&verdicts), vec![VerdictKind::Skip, VerdictKind::Skip]);
    }

    #[test]
    fn test_method_edit_does_not_touch_class() {
        let content = "class A {\n  run() {\n    go();\n  }\n\n  stop() {}\n}\n";
        let decls = TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("a.ts", content)
            .unwrap()
            .declarations;

        let changed = [LineRange::single(3)];
        let verdicts = analyze(&decls, FileScope::Changed(&changed), false);
        assert_eq!(
            kinds(&verdicts),
            vec![VerdictKind::Skip, VerdictKind::Generate, VerdictKind::Skip]
        );

        // a blank line between members belongs to the class
        let changed = [LineRange::single(5)];
        let verdicts = analyze(&decls, FileScope::Changed(&changed), false);
        assert_eq!(
            kinds(&verdicts),
            vec![VerdictKind::Generate, VerdictKind::Skip, VerdictKind::Skip]
        );
    }

    #[test]
    fn test_excluded_and_unchanged_files_skip() {
        let decls = add_sub();
        let verdicts = analyze(&decls, FileScope::Full, true);
        assert!(verdicts.iter().all(|v| v.reason == VerdictReason::ExcludedFile));

        let verdicts = analyze(&decls, FileScope::Unchanged, false);
        assert!(verdicts
            .iter()
            .all(|v| v.kind == VerdictKind::Skip && v.reason == VerdictReason::FileNotInChangeSet));
    }

    #[test]
    fn test_verdict_counts() {
        let decls = add_sub();
        let counts = VerdictCounts::from_verdicts(&analyze(&decls, FileScope::Full, false));
        assert_eq!(
            counts,
            VerdictCounts {
                skip: 1,
                generate: 1,
                regenerate: 0
            }
        );
    }
}
