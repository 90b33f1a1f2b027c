//! CLI Common Utilities
//!
//! Shared root/config resolution and change-source selection for commands.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, ConfigLoader, GitHubConfig};
use crate::pipeline::RunMode;
use crate::types::{DocsmithError, Result};
use crate::vcs::{ChangeSource, GitHubClient, LocalGitDiff, PullRequestChanges, PullRequestInfo};

/// Which changes scope a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSelection {
    Full,
    PullRequest(u64),
    Base(String),
}

impl ChangeSelection {
    pub fn from_args(pr: Option<u64>, base: Option<String>) -> Self {
        match (pr, base) {
            (Some(number), _) => ChangeSelection::PullRequest(number),
            (None, Some(base)) => ChangeSelection::Base(base),
            (None, None) => ChangeSelection::Full,
        }
    }

    pub fn uses_git(&self) -> bool {
        !matches!(self, ChangeSelection::Full)
    }
}

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub root: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// Resolve the root and load its configuration.
    ///
    /// An explicit `root` wins over `project.root`, which wins over the
    /// current directory.
    pub fn load(root: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let start = root.clone().unwrap_or_else(|| cwd.clone());
        let mut config = ConfigLoader::load(&start)?;

        let root = match (root, config.project.root.take()) {
            (Some(root), _) => root,
            (None, Some(configured)) => cwd.join(configured),
            (None, None) => cwd,
        };
        debug!("Project root: {}", root.display());
        config.project.root = Some(root.clone());

        Ok(Self { root, config })
    }

    /// Fill `project.repository_prefix` from git when it is not configured.
    pub async fn detect_repository_prefix(&mut self) {
        if !self.config.project.repository_prefix.is_empty() {
            return;
        }
        if let Some(prefix) = LocalGitDiff::repository_prefix(&self.root).await {
            debug!("Repository prefix: '{}'", prefix);
            self.config.project.repository_prefix = prefix;
        }
    }

    pub fn github_client(&self) -> Result<Arc<GitHubClient>> {
        Ok(Arc::new(GitHubClient::new(&github_config(
            &self.config.github,
        ))?))
    }

    /// Build the run mode. Pull-request runs also return the pull request.
    pub async fn run_mode(
        &mut self,
        selection: &ChangeSelection,
    ) -> Result<(RunMode, Option<(Arc<GitHubClient>, PullRequestInfo)>)> {
        if selection.uses_git() {
            self.detect_repository_prefix().await;
        }
        match selection {
            ChangeSelection::Full => Ok((RunMode::FullScan, None)),
            ChangeSelection::Base(base) => {
                let source = LocalGitDiff::new(&self.root, base.clone());
                let changes = source.change_set().await?;
                Ok((RunMode::Incremental(changes), None))
            }
            ChangeSelection::PullRequest(number) => {
                let client = self.github_client()?;
                let info = client.pull_request(*number).await?;
                let source = PullRequestChanges::new(Arc::clone(&client), *number);
                let changes = source.change_set().await?;
                debug!("{} has {} changed file(s)", source.describe(), changes.len());
                Ok((RunMode::Incremental(changes), Some((client, info))))
            }
        }
    }
}

/// GitHub settings with `GITHUB_REPOSITORY` (`owner/repo`) as a fallback for
/// the repository coordinates.
pub fn github_config(config: &GitHubConfig) -> GitHubConfig {
    let mut config = config.clone();
    if (config.owner.is_none() || config.repo.is_none())
        && let Ok(repository) = std::env::var("GITHUB_REPOSITORY")
        && let Some((owner, repo)) = repository.split_once('/')
    {
        config.owner.get_or_insert_with(|| owner.to_string());
        config.repo.get_or_insert_with(|| repo.to_string());
    }
    config
}

/// Render any serializable value as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(DocsmithError::Json)?;
    println!("{}", json);
    Ok(())
}
