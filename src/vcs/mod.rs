//! Version Control Collaborators
//!
//! Change sources feed incremental runs with the lines a change touched.
//! Paths here are repository paths (`/`-separated, relative to the repository
//! top level).

pub mod diff;
pub mod github;
pub mod local;

pub use github::{GitHubClient, PullRequestChanges, PullRequestInfo};
pub use local::LocalGitDiff;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{LineRange, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
}

impl ChangeStatus {
    /// Parse a GitHub file status
    pub fn from_github(status: &str) -> Option<Self> {
        match status {
            "added" => Some(ChangeStatus::Added),
            "modified" | "changed" => Some(ChangeStatus::Modified),
            "removed" => Some(ChangeStatus::Removed),
            "renamed" => Some(ChangeStatus::Renamed),
            "copied" => Some(ChangeStatus::Copied),
            _ => None,
        }
    }
}

/// One changed file with its new-side changed lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub previous_path: Option<String>,
    pub status: ChangeStatus,
    pub ranges: Vec<LineRange>,
}

/// Changed lines per file. Removed files are never present.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    files: BTreeMap<String, FileChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_changes(changes: impl IntoIterator<Item = FileChange>) -> Self {
        let mut set = Self::new();
        for change in changes {
            set.insert(change);
        }
        set
    }

    /// Add a file; removals are dropped.
    pub fn insert(&mut self, change: FileChange) {
        if change.status == ChangeStatus::Removed {
            return;
        }
        self.files.insert(change.path.clone(), change);
    }

    pub fn get(&self, path: &str) -> Option<&FileChange> {
        self.files.get(path)
    }

    /// Changed lines of `path`, `None` when the file did not change
    pub fn ranges_for(&self, path: &str) -> Option<&[LineRange]> {
        self.files.get(path).map(|c| c.ranges.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Supplies the change set of an incremental run
#[async_trait]
pub trait ChangeSource: Send + Sync {
    async fn change_set(&self) -> Result<ChangeSet>;

    /// Short description for logs, e.g. `pull request #42`
    fn describe(&self) -> String;
}
