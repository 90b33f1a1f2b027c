//! Scan Command
//!
//! Traversal, extraction and coverage only. Needs no backend credentials.
//!
//! Usage:
//!   docsmith scan [--root DIR] [--pr N | --base REF] [--all] [--json]

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::analyzer::{VerdictCounts, VerdictKind, VerdictReason};
use crate::cli::ui::Output;
use crate::cli::util::{ChangeSelection, CommandContext, print_json};
use crate::pipeline::{DryRunSink, FileAnalysis, Pipeline};
use crate::types::{DeclarationKind, Result};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub root: Option<PathBuf>,
    pub pr: Option<u64>,
    pub base: Option<String>,
    /// Include `Skip` verdicts in text output
    pub all: bool,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Serialize)]
struct ScannedDeclaration {
    qualified_name: String,
    kind: DeclarationKind,
    line: u32,
    documented: bool,
    verdict: VerdictKind,
    reason: VerdictReason,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ScannedFile {
    Analyzed {
        path: String,
        declarations: Vec<ScannedDeclaration>,
    },
    Failed {
        path: String,
        reason: String,
    },
}

#[derive(Debug, Serialize)]
struct ScanReport {
    mode: &'static str,
    verdicts: VerdictCounts,
    failed_files: usize,
    files: Vec<ScannedFile>,
}

pub async fn run(options: ScanOptions) -> Result<()> {
    let mut ctx = CommandContext::load(options.root.clone())?;
    let selection = ChangeSelection::from_args(options.pr, options.base.clone());
    let (mode, _) = ctx.run_mode(&selection).await?;

    let pipeline = Pipeline::new(&ctx.config, None, Arc::new(DryRunSink), CancellationToken::new());
    let analyses = pipeline.analyze_tree(&mode)?;
    let report = build_report(mode.name(), analyses);

    if options.json {
        print_json(&report)
    } else {
        print_report(&report, options.all, &Output::quiet(options.quiet));
        Ok(())
    }
}

fn build_report(mode: &'static str, analyses: Vec<FileAnalysis>) -> ScanReport {
    let mut verdicts = VerdictCounts::default();
    let mut failed_files = 0;

    let files = analyses
        .into_iter()
        .map(|analysis| match analysis {
            FileAnalysis::Analyzed(file) => {
                let declarations = file
                    .verdicts
                    .iter()
                    .filter_map(|v| {
                        verdicts.add(v.kind);
                        let decl = file.declarations.get(v.index)?;
                        Some(ScannedDeclaration {
                            qualified_name: decl.qualified_name.clone(),
                            kind: decl.kind,
                            line: decl.header_lines.start,
                            documented: decl.is_documented(),
                            verdict: v.kind,
                            reason: v.reason,
                        })
                    })
                    .collect();
                ScannedFile::Analyzed {
                    path: file.source.relative_path,
                    declarations,
                }
            }
            FileAnalysis::Failed { path, reason } => {
                failed_files += 1;
                ScannedFile::Failed { path, reason }
            }
        })
        .collect();

    ScanReport {
        mode,
        verdicts,
        failed_files,
        files,
    }
}

fn print_report(report: &ScanReport, all: bool, out: &Output) {
    out.header(&format!("docsmith scan ({})", report.mode));

    for file in &report.files {
        match file {
            ScannedFile::Analyzed { path, declarations } => {
                let shown: Vec<&ScannedDeclaration> = declarations
                    .iter()
                    .filter(|d| all || d.verdict.needs_generation())
                    .collect();
                if shown.is_empty() {
                    continue;
                }
                out.section(path);
                for decl in shown {
                    let line = format!(
                        "{:>5}  {:<10} {:<9} {} ({})",
                        decl.line,
                        decl.verdict.as_str(),
                        decl.kind.as_str(),
                        decl.qualified_name,
                        decl.reason
                    );
                    if decl.verdict.needs_generation() {
                        out.warning(&line);
                    } else {
                        out.info(&line);
                    }
                }
            }
            ScannedFile::Failed { path, reason } => out.error(&format!("{}: {}", path, reason)),
        }
    }

    out.section("Summary");
    out.stat("Generate", report.verdicts.generate);
    out.stat("Regenerate", report.verdicts.regenerate);
    out.stat("Skip", report.verdicts.skip);
    out.stat("Failed files", report.failed_files);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::RunMode;
    use tempfile::TempDir;

    #[test]
    fn test_report_counts_and_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.ts"),
            "/** Documented. */\nexport function a() {}\nexport function b() {}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.ts"), "class {\n").unwrap();

        let mut config = Config::default();
        config.project.root = Some(dir.path().to_path_buf());
        let pipeline = Pipeline::new(&config, None, Arc::new(DryRunSink), CancellationToken::new());
        let analyses = pipeline.analyze_tree(&RunMode::FullScan).unwrap();
        let report = build_report("full_scan", analyses);

        assert_eq!(report.verdicts.generate, 1);
        assert_eq!(report.verdicts.skip, 1);
        assert_eq!(report.failed_files, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["path"], "a.ts");
        assert_eq!(json["files"][0]["declarations"][1]["verdict"], "generate");
        assert_eq!(json["files"][1]["status"], "failed");
    }
}
