//! Local git diff change source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::diff::parse_git_diff;
use super::{ChangeSet, ChangeSource};
use crate::types::{DocsmithError, Result};

/// Changes between a base ref and `HEAD` of a local repository
#[derive(Debug, Clone)]
pub struct LocalGitDiff {
    repo_dir: PathBuf,
    base: String,
}

impl LocalGitDiff {
    pub fn new(repo_dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            base: base.into(),
        }
    }

    /// Path of `dir` below the repository top level, `/`-terminated
    /// (empty at the top level). `None` outside a git repository.
    pub async fn repository_prefix(dir: &Path) -> Option<String> {
        let output = git(dir, &["rev-parse", "--show-prefix"]).await.ok()?;
        Some(output.trim().to_string())
    }
}

#[async_trait]
impl ChangeSource for LocalGitDiff {
    async fn change_set(&self) -> Result<ChangeSet> {
        let range = format!("{}...HEAD", self.base);
        let output = git(
            &self.repo_dir,
            &[
                "diff",
                "--unified=0",
                "--no-color",
                "--no-ext-diff",
                "--find-renames",
                &range,
            ],
        )
        .await?;
        debug!("git diff {} produced {} bytes", range, output.len());

        let changes = parse_git_diff(&output);
        info!("{} changes {} file(s)", range, changes.len());
        Ok(ChangeSet::from_changes(changes))
    }

    fn describe(&self) -> String {
        format!("changes since {}", self.base)
    }
}

async fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .await
        .map_err(|e| DocsmithError::Vcs(format!("Failed to run git: {}", e)))?;

    if !output.status.success() {
        return Err(DocsmithError::Vcs(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
