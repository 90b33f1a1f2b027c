//! Run Command
//!
//! Analyze, generate and deliver documentation.
//!
//! Usage:
//!   docsmith run [--root DIR] [--pr N | --base REF] [--dry-run | --write | --open-pr] [--json]

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::ai::{GenerationClient, GenerationSettings, create_provider};
use crate::cli::ui::Output;
use crate::cli::util::{ChangeSelection, CommandContext, print_json};
use crate::pipeline::{
    ChangeSink, DeliveryOutcome, DiskSink, DryRunSink, FileOutcome, Pipeline, PipelineRun,
    PullRequestSink, PullRequestTarget,
};
use crate::types::Result;

/// Where the run's changes go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SinkChoice {
    #[default]
    DryRun,
    Write,
    OpenPr,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: Option<PathBuf>,
    pub pr: Option<u64>,
    pub base: Option<String>,
    pub sink: SinkChoice,
    pub json: bool,
    pub quiet: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub concurrency: Option<usize>,
    /// Force the summary document on
    pub summary: bool,
}

/// Returns `false` when delivery failed.
pub async fn run(options: RunOptions, cancel: CancellationToken) -> Result<bool> {
    let mut ctx = CommandContext::load(options.root.clone())?;
    apply_overrides(&mut ctx, &options)?;

    let selection = ChangeSelection::from_args(options.pr, options.base.clone());
    if options.sink == SinkChoice::OpenPr {
        ctx.detect_repository_prefix().await;
    }
    let (mode, pull) = ctx.run_mode(&selection).await?;

    let client = if ctx.config.features.generate_code_comments {
        let provider = create_provider(&ctx.config.llm)?;
        info!("Using {} ({})", provider.name(), provider.model());
        Some(GenerationClient::new(
            provider,
            GenerationSettings::from(&ctx.config.llm),
        ))
    } else {
        None
    };

    let sink: Arc<dyn ChangeSink> = match options.sink {
        SinkChoice::DryRun => Arc::new(DryRunSink),
        SinkChoice::Write => Arc::new(DiskSink::new(&ctx.root)),
        SinkChoice::OpenPr => {
            let (github, target) = match pull {
                Some((github, info)) => (github, PullRequestTarget::Existing(info)),
                None => (
                    ctx.github_client()?,
                    PullRequestTarget::New {
                        base: ctx.config.github.base_branch.clone(),
                    },
                ),
            };
            Arc::new(PullRequestSink::new(github, target, &ctx.config.github))
        }
    };

    let pipeline = Pipeline::new(&ctx.config, client, sink, cancel);
    let run = pipeline.run(mode).await?;

    if options.json {
        print_json(&run)?;
    } else {
        print_run(&run, &Output::quiet(options.quiet));
    }
    Ok(!run.delivery_failed())
}

fn apply_overrides(ctx: &mut CommandContext, options: &RunOptions) -> Result<()> {
    let config = &mut ctx.config;
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(concurrency) = options.concurrency {
        config.llm.concurrency = concurrency;
    }
    if options.summary {
        config.features.generate_summary_doc = true;
    }
    config.validate()
}

fn print_run(run: &PipelineRun, out: &Output) {
    let stats = run.stats();

    if let Some(DeliveryOutcome::DryRun { diffs }) = &run.delivery {
        for diff in diffs {
            out.diff(&diff.diff);
        }
    }

    out.header("docsmith run");
    out.stat("Mode", run.mode);
    out.stat("Generated", stats.generated);
    out.stat("Regenerated", stats.regenerated);
    out.stat("Skipped", stats.skipped);
    out.stat("Failed", stats.failed_declarations);
    out.stat(
        "Files",
        format!(
            "{} patched, {} unchanged, {} failed",
            stats.patched_files, stats.unchanged_files, stats.failed_files
        ),
    );
    if run.usage.total() > 0 {
        out.stat(
            "Tokens",
            format!(
                "{} in, {} out",
                run.usage.input_tokens, run.usage.output_tokens
            ),
        );
    }

    let failed_files: Vec<_> = run.failed_files().collect();
    if !failed_files.is_empty() {
        out.section("Failed files");
        for file in failed_files {
            if let FileOutcome::Failed { reason } = &file.outcome {
                out.error(&format!("{}: {}", file.path, reason));
            }
        }
    }

    let failed_decls: Vec<_> = run.failed_declarations().collect();
    if !failed_decls.is_empty() {
        out.section("Failed declarations");
        for record in failed_decls {
            if let crate::pipeline::DeclarationStatus::Failed { failure } = &record.status {
                out.error(&format!(
                    "{}:{} {}: {}",
                    record.file, record.line, record.qualified_name, failure
                ));
            }
        }
    }

    if run.cancelled {
        out.warning("Run was cancelled; files with pending results were left untouched");
    }

    match (&run.delivery, &run.delivery_error) {
        (_, Some(error)) => out.error(&format!("Delivery failed: {}", error)),
        (Some(DeliveryOutcome::Disk { written }), _) => {
            out.success(&format!("Wrote {} file(s)", written.len()))
        }
        (Some(DeliveryOutcome::DryRun { diffs }), _) => out.info(&format!(
            "Dry run: {} file(s) would change. Use --write or --open-pr to apply",
            diffs.len()
        )),
        (Some(DeliveryOutcome::PullRequest { number, url, created, .. }), _) => {
            if *created {
                out.success(&format!("Opened pull request #{}: {}", number, url));
            } else {
                out.success(&format!("Updated pull request #{}: {}", number, url));
            }
        }
        (None, None) => out.success("Documentation is up to date"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_are_validated() {
        let dir = TempDir::new().unwrap();
        let mut ctx = CommandContext::load(Some(dir.path().to_path_buf())).unwrap();

        let options = RunOptions {
            model: Some("llama3".to_string()),
            summary: true,
            ..Default::default()
        };
        apply_overrides(&mut ctx, &options).unwrap();
        assert_eq!(ctx.config.llm.model.as_deref(), Some("llama3"));
        assert!(ctx.config.features.generate_summary_doc);

        let invalid = RunOptions {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut ctx, &invalid).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_without_generation_needs_no_credentials() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export function a() {}\n").unwrap();
        std::fs::write(
            dir.path().join(crate::config::PROJECT_CONFIG_FILE),
            "[features]\ngenerate_code_comments = false\n",
        )
        .unwrap();

        let options = RunOptions {
            root: Some(dir.path().to_path_buf()),
            quiet: true,
            ..Default::default()
        };
        assert!(run(options, CancellationToken::new()).await.unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.ts")).unwrap(),
            "export function a() {}\n"
        );
    }
}
