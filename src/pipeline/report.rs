//! Run Report
//!
//! Per-file outcomes and per-declaration records of one pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sink::DeliveryOutcome;
use crate::ai::{GenerationFailure, TokenUsage};
use crate::analyzer::{VerdictCounts, VerdictKind, VerdictReason};
use crate::types::DeclarationKind;

/// Why a file was left as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// Every verdict was `Skip`
    UpToDate,
    /// Code-comment generation is switched off
    GenerationDisabled,
    /// Every requested generation failed
    NothingGenerated,
    /// Generated text produced no edit
    NoEdits,
    /// Some generation results never arrived
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Unchanged { reason: UnchangedReason },
    Patched { edits: usize },
    Failed { reason: String },
}

impl FileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Unchanged { .. } => "unchanged",
            FileOutcome::Patched { .. } => "patched",
            FileOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub outcome: FileOutcome,
    pub verdicts: VerdictCounts,
}

impl FileReport {
    pub fn failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            outcome: FileOutcome::Failed {
                reason: reason.into(),
            },
            verdicts: VerdictCounts::default(),
        }
    }
}

/// What happened to one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeclarationStatus {
    Skipped,
    Documented,
    /// Needed documentation but generation is off
    NotGenerated,
    Failed {
        #[serde(flatten)]
        failure: GenerationFailure,
    },
    /// Generated, then dropped with the rest of a failed file
    Discarded,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationRecord {
    pub file: String,
    pub qualified_name: String,
    pub kind: DeclarationKind,
    /// Header line, 1-based
    pub line: u32,
    pub verdict: VerdictKind,
    pub reason: VerdictReason,
    #[serde(flatten)]
    pub status: DeclarationStatus,
    pub attempts: u32,
}

/// Aggregate counts printed at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub generated: usize,
    pub regenerated: usize,
    pub skipped: usize,
    pub failed_declarations: usize,
    pub patched_files: usize,
    pub unchanged_files: usize,
    pub failed_files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub mode: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub declarations: Vec<DeclarationRecord>,
    pub verdicts: VerdictCounts,
    pub usage: TokenUsage,
    pub cancelled: bool,
    /// Summary document path, when one was rendered and differed from disk
    pub summary_path: Option<String>,
    pub delivery: Option<DeliveryOutcome>,
    pub delivery_error: Option<String>,
}

impl PipelineRun {
    pub fn new(mode: &'static str) -> Self {
        let now = Utc::now();
        Self {
            mode,
            started_at: now,
            finished_at: now,
            files: Vec::new(),
            declarations: Vec::new(),
            verdicts: VerdictCounts::default(),
            usage: TokenUsage::default(),
            cancelled: false,
            summary_path: None,
            delivery: None,
            delivery_error: None,
        }
    }

    pub fn file(&self, path: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn patched_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Patched { .. }))
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
    }

    pub fn failed_declarations(&self) -> impl Iterator<Item = &DeclarationRecord> {
        self.declarations
            .iter()
            .filter(|d| matches!(d.status, DeclarationStatus::Failed { .. }))
    }

    pub fn delivery_failed(&self) -> bool {
        self.delivery_error.is_some()
    }

    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats {
            skipped: self.verdicts.skip,
            ..Default::default()
        };
        for record in &self.declarations {
            match (&record.status, record.verdict) {
                (DeclarationStatus::Documented, VerdictKind::Generate) => stats.generated += 1,
                (DeclarationStatus::Documented, VerdictKind::Regenerate) => stats.regenerated += 1,
                (DeclarationStatus::Failed { .. }, _) => stats.failed_declarations += 1,
                _ => {}
            }
        }
        for file in &self.files {
            match file.outcome {
                FileOutcome::Patched { .. } => stats.patched_files += 1,
                FileOutcome::Unchanged { .. } => stats.unchanged_files += 1,
                FileOutcome::Failed { .. } => stats.failed_files += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FailureKind;
    use crate::types::ErrorCategory;

    fn record(verdict: VerdictKind, status: DeclarationStatus) -> DeclarationRecord {
        DeclarationRecord {
            file: "a.ts".to_string(),
            qualified_name: "f".to_string(),
            kind: DeclarationKind::Function,
            line: 1,
            verdict,
            reason: VerdictReason::MissingDoc,
            status,
            attempts: 1,
        }
    }

    #[test]
    fn test_stats() {
        let mut run = PipelineRun::new("full_scan");
        run.verdicts = VerdictCounts {
            skip: 3,
            generate: 2,
            regenerate: 1,
        };
        run.declarations = vec![
            record(VerdictKind::Generate, DeclarationStatus::Documented),
            record(
                VerdictKind::Generate,
                DeclarationStatus::Failed {
                    failure: GenerationFailure {
                        kind: FailureKind::NonRetryable {
                            category: ErrorCategory::Auth,
                        },
                        message: "denied".to_string(),
                        attempts: 1,
                    },
                },
            ),
            record(VerdictKind::Regenerate, DeclarationStatus::Documented),
        ];
        run.files = vec![
            FileReport {
                path: "a.ts".to_string(),
                outcome: FileOutcome::Patched { edits: 2 },
                verdicts: VerdictCounts::default(),
            },
            FileReport::failed("b.ts", "syntax error"),
        ];

        let stats = run.stats();
        assert_eq!(stats.generated, 1);
        assert_eq!(stats.regenerated, 1);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.failed_declarations, 1);
        assert_eq!(stats.patched_files, 1);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(run.failed_declarations().count(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(FileOutcome::Unchanged {
            reason: UnchangedReason::Cancelled,
        })
        .unwrap();
        assert_eq!(json["status"], "unchanged");
        assert_eq!(json["reason"], "cancelled");
    }
}
