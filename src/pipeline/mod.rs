//! Pipeline Orchestrator
//!
//! Traversal → extraction → coverage → generation → patching → delivery.
//!
//! The orchestrator is the only component that knows the run mode and the
//! sink. A failure in one file never stops the others; every file ends up
//! in the run report with its outcome.

pub mod report;
pub mod sink;
pub mod summary;

pub use report::{
    DeclarationRecord, DeclarationStatus, FileOutcome, FileReport, PipelineRun, RunStats,
    UnchangedReason,
};
pub use sink::{
    ChangeSink, Delivery, DeliveryOutcome, DiskSink, DryRunSink, FileDiff, FileUpdate,
    PullRequestSink, PullRequestTarget,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::ai::{ContextWindow, DocRequest, GenerationBatch, GenerationClient, GenerationResult};
use crate::analyzer::parser::{Language, create_parser};
use crate::analyzer::scanner::{FileScanner, is_generated_file};
use crate::analyzer::{CoverageVerdict, FileScope, VerdictCounts, VerdictKind, analyze};
use crate::config::Config;
use crate::patch::{CommentFormatter, DocText, apply_edits, plan_edits};
use crate::types::{Declaration, LineIndex, Result, SourceFile, relative_path};
use crate::vcs::ChangeSet;
use summary::{SummaryEntry, SummaryFile};

/// Full scan, or scoped to a change set
#[derive(Debug, Clone)]
pub enum RunMode {
    FullScan,
    Incremental(ChangeSet),
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::FullScan => "full_scan",
            RunMode::Incremental(_) => "incremental",
        }
    }

    fn scope<'a>(&'a self, repository_path: &str) -> FileScope<'a> {
        match self {
            RunMode::FullScan => FileScope::Full,
            RunMode::Incremental(changes) => match changes.ranges_for(repository_path) {
                Some(ranges) => FileScope::Changed(ranges),
                None => FileScope::Unchanged,
            },
        }
    }
}

/// A parsed file and its verdicts
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub source: SourceFile,
    pub language: Language,
    pub declarations: Vec<Declaration>,
    pub verdicts: Vec<CoverageVerdict>,
    /// Generated type definitions: reported, never patched
    pub excluded: bool,
}

impl AnalyzedFile {
    fn requests(&self, window: ContextWindow) -> Vec<DocRequest> {
        let text = self.source.text();
        let index = LineIndex::new(text);
        self.verdicts
            .iter()
            .filter(|v| v.kind.needs_generation())
            .filter_map(|v| {
                let decl = self.declarations.get(v.index)?;
                Some(DocRequest::new(
                    &self.source.relative_path,
                    self.language,
                    text,
                    &index,
                    decl,
                    v.index,
                    window,
                ))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum FileAnalysis {
    Analyzed(AnalyzedFile),
    Failed { path: String, reason: String },
}

/// Per-file products folded into the run
struct FinishedFile {
    report: FileReport,
    records: Vec<DeclarationRecord>,
    update: Option<FileUpdate>,
    summary: SummaryFile,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    root: PathBuf,
    client: Option<GenerationClient>,
    sink: Arc<dyn ChangeSink>,
    cancel: CancellationToken,
    formatter: CommentFormatter,
    window: ContextWindow,
}

impl<'a> Pipeline<'a> {
    /// `client` may be `None` when no generation is wanted; verdicts are
    /// still computed and reported.
    pub fn new(
        config: &'a Config,
        client: Option<GenerationClient>,
        sink: Arc<dyn ChangeSink>,
        cancel: CancellationToken,
    ) -> Self {
        let root = config
            .project
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config,
            root,
            client,
            sink,
            cancel,
            formatter: CommentFormatter::new(config.comments.wrap_width),
            window: ContextWindow {
                lines_before: config.llm.context_lines_before,
                max_lines: config.llm.context_max_lines,
                ..Default::default()
            },
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Traverse, parse and judge every source file under the root.
    ///
    /// Only an unreadable root fails; per-file problems come back as
    /// `FileAnalysis::Failed`.
    pub fn analyze_tree(&self, mode: &RunMode) -> Result<Vec<FileAnalysis>> {
        let scanner = FileScanner::from_config(&self.root, &self.config.traversal);
        let mut analyses = Vec::new();

        for entry in scanner.scan()? {
            match entry {
                Ok(file) => analyses.push(self.analyze_file(&file.path, mode)),
                Err(err) => {
                    let path = err
                        .path
                        .as_deref()
                        .map(|p| relative_path(&self.root, p))
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!("Skipping unreadable entry {}: {}", path, err.message);
                    analyses.push(FileAnalysis::Failed {
                        path,
                        reason: err.message,
                    });
                }
            }
        }
        Ok(analyses)
    }

    fn analyze_file(&self, path: &Path, mode: &RunMode) -> FileAnalysis {
        let relative = relative_path(&self.root, path);
        let failed = |reason: String| {
            warn!("{}: {}", relative, reason);
            FileAnalysis::Failed {
                path: relative.clone(),
                reason,
            }
        };

        let source = match SourceFile::load(&self.root, path) {
            Ok(source) => source,
            Err(e) => return failed(format!("unreadable: {}", e)),
        };
        let Some(language) = Language::from_path(path) else {
            return failed("unsupported file type".to_string());
        };
        let declarations = match create_parser(language)
            .and_then(|parser| parser.parse(&relative, source.text()))
        {
            Ok(parsed) => parsed.declarations,
            Err(e) => return failed(e.to_string()),
        };

        let excluded = is_generated_file(&relative, &self.config.traversal.generated_suffixes);
        let repository_path = self.config.project.repository_path(&relative);
        let verdicts = analyze(&declarations, mode.scope(&repository_path), excluded);
        debug!(
            "{}: {} declaration(s), {} need documentation",
            relative,
            declarations.len(),
            verdicts.iter().filter(|v| v.kind.needs_generation()).count()
        );

        FileAnalysis::Analyzed(AnalyzedFile {
            source,
            language,
            declarations,
            verdicts,
            excluded,
        })
    }

    fn generation_client(&self) -> Option<&GenerationClient> {
        if !self.config.features.generate_code_comments {
            return None;
        }
        if self.client.is_none() {
            warn!("No generation client configured; reporting verdicts only");
        }
        self.client.as_ref()
    }

    /// Run the whole pipeline and deliver the result to the sink.
    ///
    /// Returns `Err` only for fatal errors. Delivery failures are recorded in
    /// the run.
    #[instrument(skip_all, fields(mode = mode.name(), root = %self.root.display()))]
    pub async fn run(&self, mode: RunMode) -> Result<PipelineRun> {
        let mut run = PipelineRun::new(mode.name());
        let analyses = self.analyze_tree(&mode)?;
        info!("Analyzed {} file(s)", analyses.len());

        let client = self.generation_client();
        let batch = match client {
            Some(client) => {
                let requests: Vec<DocRequest> = analyses
                    .iter()
                    .filter_map(|a| match a {
                        FileAnalysis::Analyzed(file) => Some(file.requests(self.window)),
                        FileAnalysis::Failed { .. } => None,
                    })
                    .flatten()
                    .collect();
                if requests.is_empty() {
                    GenerationBatch::default()
                } else {
                    info!(
                        "Requesting documentation for {} declaration(s) via {}",
                        requests.len(),
                        client.provider_name()
                    );
                    client.generate_all(requests, &self.cancel).await
                }
            }
            None => GenerationBatch::default(),
        };

        run.cancelled = batch.cancelled;
        let mut results: HashMap<(String, usize), GenerationResult> = HashMap::new();
        for result in batch.results {
            run.usage += result.usage;
            results.insert((result.file_path.clone(), result.index), result);
        }

        let mut delivery = Delivery::default();
        let mut summaries = Vec::new();
        for analysis in analyses {
            match analysis {
                FileAnalysis::Failed { path, reason } => {
                    run.files.push(FileReport::failed(path, reason));
                }
                FileAnalysis::Analyzed(file) => {
                    let finished = self.finish_file(file, &mut results, client.is_some());
                    run.verdicts.merge(&finished.report.verdicts);
                    run.files.push(finished.report);
                    run.declarations.extend(finished.records);
                    delivery.updates.extend(finished.update);
                    summaries.push(finished.summary);
                }
            }
        }

        if self.config.features.generate_summary_doc && !run.cancelled {
            match self.summary_update(&summaries) {
                Ok(Some(update)) => {
                    run.summary_path = Some(update.relative_path.clone());
                    delivery.updates.push(update);
                }
                Ok(None) => debug!("Summary document is up to date"),
                Err(e) => warn!("Skipping summary document: {}", e),
            }
        }

        let stats = run.stats();
        delivery.verdicts = run.verdicts;
        delivery.generated = stats.generated;
        delivery.regenerated = stats.regenerated;
        delivery.failed_declarations = stats.failed_declarations;

        if delivery.updates.is_empty() {
            info!("No files to deliver");
        } else {
            info!(
                "Delivering {} file(s) via {}",
                delivery.updates.len(),
                self.sink.name()
            );
            match self.sink.deliver(&delivery).await {
                Ok(outcome) => run.delivery = Some(outcome),
                Err(e) => {
                    error!("Delivery failed: {}", e);
                    run.delivery_error = Some(e.to_string());
                }
            }
        }

        run.finished_at = Utc::now();
        info!(
            "Run finished: {} patched, {} unchanged, {} failed file(s)",
            stats.patched_files, stats.unchanged_files, stats.failed_files
        );
        Ok(run)
    }

    fn finish_file(
        &self,
        file: AnalyzedFile,
        results: &mut HashMap<(String, usize), GenerationResult>,
        generating: bool,
    ) -> FinishedFile {
        let AnalyzedFile {
            source,
            declarations,
            verdicts,
            ..
        } = file;
        let path = source.relative_path.clone();
        let counts = VerdictCounts::from_verdicts(&verdicts);

        let mut records = Vec::with_capacity(verdicts.len());
        let mut texts: Vec<(usize, VerdictKind, String)> = Vec::new();
        let mut incomplete = false;

        for verdict in &verdicts {
            let Some(decl) = declarations.get(verdict.index) else {
                continue;
            };
            let (status, attempts) = if !verdict.kind.needs_generation() {
                (DeclarationStatus::Skipped, 0)
            } else if !generating {
                (DeclarationStatus::NotGenerated, 0)
            } else {
                match results.remove(&(path.clone(), verdict.index)) {
                    None => {
                        incomplete = true;
                        (DeclarationStatus::Cancelled, 0)
                    }
                    Some(result) => match result.outcome {
                        Ok(text) => {
                            texts.push((verdict.index, verdict.kind, text));
                            (DeclarationStatus::Documented, result.attempts)
                        }
                        Err(failure) => (DeclarationStatus::Failed { failure }, result.attempts),
                    },
                }
            };
            records.push(DeclarationRecord {
                file: path.clone(),
                qualified_name: decl.qualified_name.clone(),
                kind: decl.kind,
                line: decl.header_lines.start,
                verdict: verdict.kind,
                reason: verdict.reason,
                status,
                attempts,
            });
        }

        let unchanged = |reason| FileOutcome::Unchanged { reason };
        let mut update = None;
        let outcome = if counts.generate + counts.regenerate == 0 {
            unchanged(UnchangedReason::UpToDate)
        } else if !generating {
            unchanged(UnchangedReason::GenerationDisabled)
        } else if incomplete {
            debug!("{}: results incomplete, leaving untouched", path);
            relabel(&mut records, DeclarationStatus::Cancelled);
            unchanged(UnchangedReason::Cancelled)
        } else if texts.is_empty() {
            unchanged(UnchangedReason::NothingGenerated)
        } else {
            let docs: Vec<DocText<'_>> = texts
                .iter()
                .map(|(index, verdict, text)| DocText {
                    index: *index,
                    verdict: *verdict,
                    text,
                })
                .collect();
            let edits = plan_edits(&source, &declarations, &docs, &self.formatter);
            if edits.is_empty() {
                unchanged(UnchangedReason::NoEdits)
            } else {
                match apply_edits(&source, edits) {
                    Ok((set, patched)) => {
                        let documented: Vec<String> = texts
                            .iter()
                            .filter_map(|(i, _, _)| declarations.get(*i))
                            .map(|d| d.qualified_name.clone())
                            .collect();
                        let edits = set.len();
                        info!("{}: documented {} declaration(s)", path, documented.len());
                        update = Some(FileUpdate::patched(
                            &path,
                            self.config.project.repository_path(&path),
                            source.text(),
                            patched.text().to_string(),
                            set,
                            documented,
                        ));
                        FileOutcome::Patched { edits }
                    }
                    Err(e) => {
                        warn!("{}: {}", path, e);
                        relabel(&mut records, DeclarationStatus::Discarded);
                        FileOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        // Text that ends up attached to each declaration after this run
        let applied: HashMap<usize, &str> = if update.is_some() {
            texts.iter().map(|(i, _, t)| (*i, t.as_str())).collect()
        } else {
            HashMap::new()
        };
        let entries = declarations
            .iter()
            .enumerate()
            .filter_map(|(i, decl)| {
                let doc = match applied.get(&i) {
                    Some(text) => text.to_string(),
                    None => decl.doc.as_ref()?.content(),
                };
                Some(SummaryEntry {
                    kind: decl.kind,
                    qualified_name: decl.qualified_name.clone(),
                    signature: decl.signature.text.clone(),
                    doc,
                })
            })
            .collect();

        FinishedFile {
            report: FileReport {
                path: path.clone(),
                outcome,
                verdicts: counts,
            },
            records,
            update,
            summary: SummaryFile { path, entries },
        }
    }

    /// The summary document, when its content differs from what is on disk
    fn summary_update(&self, files: &[SummaryFile]) -> Result<Option<FileUpdate>> {
        let relative = self.config.features.summary_path.trim_start_matches('/');
        let rendered = summary::render(files);

        let existing = match std::fs::read_to_string(self.root.join(relative)) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if existing == rendered {
            return Ok(None);
        }

        FileUpdate::whole(
            relative,
            self.config.project.repository_path(relative),
            existing,
            rendered,
            "docs: update documentation summary",
        )
        .map(Some)
    }
}

/// Mark generated-but-unapplied declarations
fn relabel(records: &mut [DeclarationRecord], status: DeclarationStatus) {
    for record in records {
        if record.status == DeclarationStatus::Documented {
            record.status = status.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::generation::tests::{ScriptedProvider, fast_settings};
    use crate::ai::{ErrorCategory, LlmError, SharedProvider};
    use crate::types::LineRange;
    use crate::vcs::{ChangeStatus, FileChange};
    use tempfile::TempDir;

    const MATH: &str = "function add(a, b) {\n  return a + b;\n}\n\n/** Subtracts. */\n\nfunction sub(a, b) {\n  return a - b;\n}\n";
    const STORE: &str = "export class Store {\n  get(key: string): string {\n    return key;\n  }\n}\n";

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        dir
    }

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.project.root = Some(dir.path().to_path_buf());
        config
    }

    fn client(provider: &Arc<ScriptedProvider>) -> GenerationClient {
        let shared: SharedProvider = provider.clone();
        GenerationClient::new(shared, fast_settings())
    }

    fn read(dir: &TempDir, path: &str) -> String {
        std::fs::read_to_string(dir.path().join(path)).unwrap()
    }

    #[tokio::test]
    async fn test_full_scan_is_idempotent() {
        let dir = tree(&[("src/math.ts", MATH), ("src/store.ts", STORE)]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Adds two numbers."));
        let sink = Arc::new(DiskSink::new(dir.path()));

        let first = Pipeline::new(&config, Some(client(&provider)), sink.clone(), CancellationToken::new())
            .run(RunMode::FullScan)
            .await
            .unwrap();
        assert_eq!(first.stats().patched_files, 2);
        assert_eq!(first.stats().generated, 3);
        assert!(read(&dir, "src/math.ts").starts_with("/**\n * Adds two numbers.\n */\nfunction add"));

        let calls = provider.calls.load(std::sync::atomic::Ordering::SeqCst);
        let second = Pipeline::new(&config, Some(client(&provider)), sink, CancellationToken::new())
            .run(RunMode::FullScan)
            .await
            .unwrap();
        assert_eq!(second.stats().patched_files, 0);
        assert!(second.delivery.is_none());
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let dir = tree(&[
            ("a.ts", "export function a() {}\n"),
            ("b.ts", "function broken( {\n"),
            ("c.ts", "export function c() {}\n"),
        ]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Does things."));
        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DiskSink::new(dir.path())),
            CancellationToken::new(),
        )
        .run(RunMode::FullScan)
        .await
        .unwrap();

        let stats = run.stats();
        assert_eq!(stats.patched_files, 2);
        assert_eq!(stats.failed_files, 1);
        assert!(matches!(
            run.file("b.ts").unwrap().outcome,
            FileOutcome::Failed { .. }
        ));
        assert_eq!(read(&dir, "b.ts"), "function broken( {\n");
        assert!(run.delivery_error.is_none());
    }

    #[tokio::test]
    async fn test_incremental_regenerates_touched_doc() {
        let dir = tree(&[("math.ts", MATH)]);
        let config = config(&dir);
        let changes = ChangeSet::from_changes(vec![FileChange {
            path: "math.ts".to_string(),
            previous_path: None,
            status: ChangeStatus::Modified,
            ranges: vec![LineRange::single(7)],
        }]);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Subtracts b from a."));
        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DryRunSink),
            CancellationToken::new(),
        )
        .run(RunMode::Incremental(changes))
        .await
        .unwrap();

        let verdicts: Vec<(&str, VerdictKind)> = run
            .declarations
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.verdict))
            .collect();
        assert_eq!(
            verdicts,
            vec![("add", VerdictKind::Skip), ("sub", VerdictKind::Regenerate)]
        );
        assert_eq!(run.stats().regenerated, 1);

        let Some(DeliveryOutcome::DryRun { diffs }) = &run.delivery else {
            panic!("expected a dry-run delivery");
        };
        assert!(diffs[0].diff.contains("-/** Subtracts. */\n+/**\n+ * Subtracts b from a.\n+ */\n"));
        // dry runs never write
        assert_eq!(read(&dir, "math.ts"), MATH);
    }

    #[tokio::test]
    async fn test_file_outside_change_set_skipped() {
        let dir = tree(&[("math.ts", MATH)]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Unused."));
        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DryRunSink),
            CancellationToken::new(),
        )
        .run(RunMode::Incremental(ChangeSet::new()))
        .await
        .unwrap();

        assert_eq!(run.verdicts.skip, 2);
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(
            run.file("math.ts").unwrap().outcome,
            FileOutcome::Unchanged {
                reason: UnchangedReason::UpToDate
            }
        );
    }

    #[tokio::test]
    async fn test_declaration_failure_keeps_rest_of_file() {
        let dir = tree(&[(
            "a.ts",
            "export function first() {}\n\nexport function second() {}\n",
        )]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(LlmError::new(ErrorCategory::Auth, "denied"))],
            "Does the second thing.",
        ));
        let settings = crate::ai::GenerationSettings {
            concurrency: 1,
            ..fast_settings()
        };
        let shared: SharedProvider = provider.clone();
        let run = Pipeline::new(
            &config,
            Some(GenerationClient::new(shared, settings)),
            Arc::new(DiskSink::new(dir.path())),
            CancellationToken::new(),
        )
        .run(RunMode::FullScan)
        .await
        .unwrap();

        assert_eq!(run.stats().failed_declarations, 1);
        assert_eq!(run.stats().generated, 1);
        assert_eq!(
            read(&dir, "a.ts"),
            "export function first() {}\n\n/**\n * Does the second thing.\n */\nexport function second() {}\n"
        );
    }

    #[tokio::test]
    async fn test_generation_disabled_reports_verdicts() {
        let dir = tree(&[("math.ts", MATH)]);
        let mut config = config(&dir);
        config.features.generate_code_comments = false;
        let provider = Arc::new(ScriptedProvider::new(vec![], "Unused."));
        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DiskSink::new(dir.path())),
            CancellationToken::new(),
        )
        .run(RunMode::FullScan)
        .await
        .unwrap();

        assert_eq!(run.verdicts.generate, 1);
        assert_eq!(run.declarations[0].status, DeclarationStatus::NotGenerated);
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(read(&dir, "math.ts"), MATH);
    }

    #[tokio::test]
    async fn test_cancelled_run_patches_nothing() {
        let dir = tree(&[("math.ts", MATH)]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Adds."));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DiskSink::new(dir.path())),
            cancel,
        )
        .run(RunMode::FullScan)
        .await
        .unwrap();

        assert!(run.cancelled);
        assert_eq!(
            run.file("math.ts").unwrap().outcome,
            FileOutcome::Unchanged {
                reason: UnchangedReason::Cancelled
            }
        );
        assert!(run.delivery.is_none());
        assert_eq!(read(&dir, "math.ts"), MATH);
    }

    #[tokio::test]
    async fn test_generated_definitions_never_patched() {
        let dir = tree(&[("types.d.ts", "export declare function f(): void;\n")]);
        let config = config(&dir);
        let provider = Arc::new(ScriptedProvider::new(vec![], "Unused."));
        let run = Pipeline::new(
            &config,
            Some(client(&provider)),
            Arc::new(DiskSink::new(dir.path())),
            CancellationToken::new(),
        )
        .run(RunMode::FullScan)
        .await
        .unwrap();

        assert_eq!(run.verdicts.generate, 0);
        assert_eq!(run.declarations[0].reason, crate::analyzer::VerdictReason::ExcludedFile);
    }

    #[tokio::test]
    async fn test_summary_document_written_once() {
        let dir = tree(&[("src/math.ts", MATH)]);
        let mut config = config(&dir);
        config.features.generate_summary_doc = true;
        config.features.summary_path = "docs/API.md".to_string();
        let provider = Arc::new(ScriptedProvider::new(vec![], "Adds two numbers."));
        let sink = Arc::new(DiskSink::new(dir.path()));

        let first = Pipeline::new(&config, Some(client(&provider)), sink.clone(), CancellationToken::new())
            .run(RunMode::FullScan)
            .await
            .unwrap();
        assert_eq!(first.summary_path.as_deref(), Some("docs/API.md"));
        let summary = read(&dir, "docs/API.md");
        assert!(summary.contains("- **add** (function): `function add(a, b)`\n  Adds two numbers.\n"));
        assert!(summary.contains("- **sub** (function): `function sub(a, b)`\n  Subtracts.\n"));

        let second = Pipeline::new(&config, Some(client(&provider)), sink, CancellationToken::new())
            .run(RunMode::FullScan)
            .await
            .unwrap();
        assert!(second.summary_path.is_none());
        assert!(second.delivery.is_none());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.project.root = Some(dir.path().join("missing"));
        let result = Pipeline::new(&config, None, Arc::new(DryRunSink), CancellationToken::new())
            .run(RunMode::FullScan)
            .await;
        assert!(matches!(
            result,
            Err(crate::types::DocsmithError::RootUnreadable { .. })
        ));
    }
}
