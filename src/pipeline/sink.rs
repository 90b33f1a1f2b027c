//! Change Sinks
//!
//! Where a run's modified files go: the local disk, a pull request, or a
//! dry-run report of unified diffs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzer::VerdictCounts;
use crate::config::GitHubConfig;
use crate::constants::patch;
use crate::patch::{Edit, PatchSet};
use crate::types::{DocsmithError, Result};
use crate::vcs::github::CommitFile;
use crate::vcs::{GitHubClient, PullRequestInfo};

/// One file the run wants to change
#[derive(Debug, Clone)]
pub struct FileUpdate {
    /// Path relative to the run root
    pub relative_path: String,
    /// Path relative to the repository top level
    pub repository_path: String,
    pub original: String,
    pub content: String,
    pub patch: PatchSet,
    /// Qualified names documented by this update
    pub documented: Vec<String>,
    pub message: String,
}

impl FileUpdate {
    pub fn patched(
        relative_path: &str,
        repository_path: String,
        original: &str,
        content: String,
        patch: PatchSet,
        documented: Vec<String>,
    ) -> Self {
        let message = format!(
            "docs: document {} declaration(s) in {}",
            documented.len(),
            relative_path
        );
        Self {
            relative_path: relative_path.to_string(),
            repository_path,
            original: original.to_string(),
            content,
            patch,
            documented,
            message,
        }
    }

    /// Replace a whole file, creating it when `original` is empty.
    pub fn whole(
        relative_path: &str,
        repository_path: String,
        original: String,
        content: String,
        message: impl Into<String>,
    ) -> Result<Self> {
        let edit = Edit::replace(0..original.len(), content.clone());
        let patch = PatchSet::new(relative_path, &original, vec![edit])?;
        Ok(Self {
            relative_path: relative_path.to_string(),
            repository_path,
            original,
            content,
            patch,
            documented: Vec::new(),
            message: message.into(),
        })
    }

    pub fn diff(&self) -> Result<String> {
        self.patch
            .unified_diff(&self.original, patch::DIFF_CONTEXT_LINES)
    }
}

/// Everything handed to a sink at the end of a run
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    pub updates: Vec<FileUpdate>,
    pub verdicts: VerdictCounts,
    pub generated: usize,
    pub regenerated: usize,
    pub failed_declarations: usize,
}

impl Delivery {
    pub fn documented_count(&self) -> usize {
        self.updates.iter().map(|u| u.documented.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sink", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Disk {
        written: Vec<String>,
    },
    DryRun {
        diffs: Vec<FileDiff>,
    },
    PullRequest {
        branch: String,
        commit: String,
        number: u64,
        url: String,
        /// False when a pull request for the branch was already open
        created: bool,
    },
}

#[async_trait]
pub trait ChangeSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, delivery: &Delivery) -> Result<DeliveryOutcome>;
}

// =============================================================================
// Disk
// =============================================================================

/// Writes each file in place through a temporary sibling and a rename
#[derive(Debug, Clone)]
pub struct DiskSink {
    root: PathBuf,
}

impl DiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn write_one(&self, update: &FileUpdate) -> std::result::Result<(), String> {
        let path = self.root.join(&update.relative_path);

        let on_disk = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.to_string()),
        };
        if on_disk != update.original {
            return Err("file changed on disk during the run".to_string());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        write_atomic(&path, &update.content)
            .await
            .map_err(|e| e.to_string())
    }
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let tmp_path = path.with_file_name(format!(".{}.docsmith-tmp", name));

    tokio::fs::write(&tmp_path, content).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl ChangeSink for DiskSink {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<DeliveryOutcome> {
        let mut written = Vec::new();
        let mut failures = Vec::new();

        for update in &delivery.updates {
            match self.write_one(update).await {
                Ok(()) => {
                    debug!("Wrote {}", update.relative_path);
                    written.push(update.relative_path.clone());
                }
                Err(e) => {
                    warn!("Failed to write {}: {}", update.relative_path, e);
                    failures.push(format!("{}: {}", update.relative_path, e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(DocsmithError::Delivery {
                sink: self.name().to_string(),
                message: format!(
                    "{} of {} file(s) not written ({})",
                    failures.len(),
                    delivery.updates.len(),
                    failures.join("; ")
                ),
            });
        }

        info!("Wrote {} file(s)", written.len());
        Ok(DeliveryOutcome::Disk { written })
    }
}

// =============================================================================
// Dry Run
// =============================================================================

/// Reports unified diffs and touches nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSink;

#[async_trait]
impl ChangeSink for DryRunSink {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<DeliveryOutcome> {
        let diffs = delivery
            .updates
            .iter()
            .map(|update| {
                Ok(FileDiff {
                    path: update.relative_path.clone(),
                    diff: update.diff()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DeliveryOutcome::DryRun { diffs })
    }
}

// =============================================================================
// Pull Request
// =============================================================================

/// Where documentation commits go
#[derive(Debug, Clone)]
pub enum PullRequestTarget {
    /// A pull request into the head branch of an existing one
    Existing(PullRequestInfo),
    /// A new branch off `base` (the repository default when `None`)
    New { base: Option<String> },
}

pub struct PullRequestSink {
    client: Arc<GitHubClient>,
    target: PullRequestTarget,
    branch_prefix: String,
    labels: Vec<String>,
    reviewers: Vec<String>,
    /// Suffix of full-scan branch names
    stamp: String,
}

impl PullRequestSink {
    pub fn new(client: Arc<GitHubClient>, target: PullRequestTarget, config: &GitHubConfig) -> Self {
        Self {
            client,
            target,
            branch_prefix: config.branch_prefix.trim_end_matches('/').to_string(),
            labels: config.labels.clone(),
            reviewers: config.reviewers.clone(),
            stamp: Utc::now().format("%Y%m%d-%H%M%S").to_string(),
        }
    }

    pub fn branch_name(&self) -> String {
        match &self.target {
            PullRequestTarget::Existing(pr) => format!("{}/pr-{}", self.branch_prefix, pr.number),
            PullRequestTarget::New { .. } => format!("{}/{}", self.branch_prefix, self.stamp),
        }
    }

    pub fn title(&self) -> String {
        match &self.target {
            PullRequestTarget::Existing(pr) => format!("docs: documentation for #{}", pr.number),
            PullRequestTarget::New { .. } => "docs: generated documentation".to_string(),
        }
    }

    /// Base branch and the commit the documentation branch starts from
    async fn base(&self) -> Result<(String, String)> {
        match &self.target {
            PullRequestTarget::Existing(pr) => {
                if pr.from_fork {
                    return Err(DocsmithError::Vcs(format!(
                        "pull request #{} comes from a fork; its branch cannot be targeted",
                        pr.number
                    )));
                }
                Ok((pr.head_ref.clone(), pr.head_sha.clone()))
            }
            PullRequestTarget::New { base } => {
                let base = match base {
                    Some(base) => base.clone(),
                    None => self.client.default_branch().await?,
                };
                let head = self
                    .client
                    .branch_head(&base)
                    .await?
                    .ok_or_else(|| DocsmithError::Vcs(format!("base branch {} not found", base)))?;
                Ok((base, head))
            }
        }
    }

    async fn open(&self, delivery: &Delivery) -> Result<DeliveryOutcome> {
        let branch = self.branch_name();
        let (base, start) = self.base().await?;

        let parent = match self.client.branch_head(&branch).await? {
            Some(sha) => sha,
            None => {
                self.client.create_branch(&branch, &start).await?;
                start
            }
        };

        let files: Vec<CommitFile> = delivery
            .updates
            .iter()
            .map(|u| CommitFile {
                path: u.repository_path.clone(),
                content: u.content.clone(),
            })
            .collect();
        let commit = self
            .client
            .commit_files(&branch, &parent, &files, &commit_message(delivery))
            .await?;

        if let Some(existing) = self.client.open_pull_for(&branch).await? {
            info!("Pull request #{} already open for {}", existing.number, branch);
            return Ok(DeliveryOutcome::PullRequest {
                branch,
                commit,
                number: existing.number,
                url: existing.url,
                created: false,
            });
        }

        let pull = self
            .client
            .create_pull(&self.title(), &pull_request_body(delivery), &branch, &base)
            .await?;
        info!("Opened pull request #{}: {}", pull.number, pull.url);

        // The pull request exists either way
        if let Err(e) = self.client.add_labels(pull.number, &self.labels).await {
            warn!("Failed to label #{}: {}", pull.number, e);
        }
        if let Err(e) = self.client.request_reviewers(pull.number, &self.reviewers).await {
            warn!("Failed to request reviewers on #{}: {}", pull.number, e);
        }

        Ok(DeliveryOutcome::PullRequest {
            branch,
            commit,
            number: pull.number,
            url: pull.url,
            created: true,
        })
    }
}

#[async_trait]
impl ChangeSink for PullRequestSink {
    fn name(&self) -> &'static str {
        "pull-request"
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<DeliveryOutcome> {
        self.open(delivery)
            .await
            .map_err(|e| DocsmithError::Delivery {
                sink: self.name().to_string(),
                message: e.to_string(),
            })
    }
}

/// One commit for the batch; its body repeats the per-file messages.
pub fn commit_message(delivery: &Delivery) -> String {
    match delivery.updates.as_slice() {
        [single] => single.message.clone(),
        updates => {
            let mut message = format!(
                "docs: document {} declaration(s) in {} files\n",
                delivery.documented_count(),
                updates.len()
            );
            for update in updates {
                message.push_str(&format!("\n- {}", update.message));
            }
            message
        }
    }
}

pub fn pull_request_body(delivery: &Delivery) -> String {
    let mut body = String::from("Documentation comments generated by docsmith.\n\n");
    body.push_str("| Verdict | Count |\n|---|---|\n");
    body.push_str(&format!("| Generated | {} |\n", delivery.generated));
    body.push_str(&format!("| Regenerated | {} |\n", delivery.regenerated));
    body.push_str(&format!("| Skipped | {} |\n", delivery.verdicts.skip));
    body.push_str(&format!("| Failed | {} |\n", delivery.failed_declarations));

    body.push_str("\n### Files\n\n");
    for update in &delivery.updates {
        if update.documented.is_empty() {
            body.push_str(&format!("- `{}`\n", update.relative_path));
        } else {
            let names: Vec<String> = update
                .documented
                .iter()
                .map(|n| format!("`{}`", n))
                .collect();
            body.push_str(&format!(
                "- `{}`: {}\n",
                update.relative_path,
                names.join(", ")
            ));
        }
    }
    body
}
