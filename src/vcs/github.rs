//! GitHub REST client
//!
//! Reads pull-request changes and writes documentation commits through the
//! git data API (blobs, tree, commit, ref update) so no local checkout is
//! needed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::diff::parse_patch;
use super::{ChangeSet, ChangeSource, ChangeStatus, FileChange};
use crate::ai::provider::validate_endpoint;
use crate::config::GitHubConfig;
use crate::constants::network;
use crate::types::{DocsmithError, LineRange, Result};

const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
/// Longest error body quoted back in error messages
const MAX_ERROR_BODY: usize = 300;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
    status: String,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    previous_filename: Option<String>,
    /// Added plus deleted lines. Zero for pure renames, which carry no patch
    #[serde(default)]
    changes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    head: BranchRef,
    base: BranchRef,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
    sha: String,
    #[serde(default)]
    repo: Option<RepoName>,
}

#[derive(Debug, Deserialize)]
struct RepoName {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaObject,
}

#[derive(Debug, Serialize)]
struct TreeEntry<'a> {
    path: &'a str,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: String,
}

// =============================================================================
// Public Types
// =============================================================================

/// The parts of a pull request a run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: u64,
    pub url: String,
    pub head_ref: String,
    pub head_sha: String,
    pub base_ref: String,
    /// Head branch lives in another repository
    pub from_fork: bool,
}

/// A file written by a documentation commit
#[derive(Debug, Clone)]
pub struct CommitFile {
    pub path: String,
    pub content: String,
}

// =============================================================================
// Client
// =============================================================================

pub struct GitHubClient {
    api_base: String,
    owner: String,
    repo: String,
    /// Never exposed in logs or debug output
    token: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let owner = required(config.owner.as_deref(), "github.owner")?;
        let repo = required(config.repo.as_deref(), "github.repo")?;

        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DocsmithError::MissingCredentials(
                    "GitHub token not found. Set GITHUB_TOKEN or github.token".to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("docsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocsmithError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base: validate_endpoint(&config.api_base, "github")?,
            owner,
            repo,
            token: SecretString::from(token),
            client,
        })
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo)
        } else {
            format!("{}/repos/{}/{}/{}", self.api_base, self.owner, self.repo, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token.expose_secret())
            .header(header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send and decode, `None` on 404
    async fn send_optional<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| DocsmithError::Vcs(format!("GitHub request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(DocsmithError::Vcs(format!(
                "GitHub API returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| DocsmithError::Vcs(format!("Invalid GitHub response: {}", e)))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.send_optional(builder)
            .await?
            .ok_or_else(|| DocsmithError::Vcs(format!("GitHub returned 404 for {}", what)))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn pull_request(&self, number: u64) -> Result<PullRequestInfo> {
        let pull: PullResponse = self
            .send(
                self.request(Method::GET, &format!("pulls/{}", number)),
                &format!("pull request #{}", number),
            )
            .await?;
        Ok(self.pull_info(pull))
    }

    fn pull_info(&self, pull: PullResponse) -> PullRequestInfo {
        let repository = self.repository();
        let from_fork = pull
            .head
            .repo
            .as_ref()
            .is_none_or(|r| !r.full_name.eq_ignore_ascii_case(&repository));
        PullRequestInfo {
            number: pull.number,
            url: pull.html_url,
            head_ref: pull.head.name,
            head_sha: pull.head.sha,
            base_ref: pull.base.name,
            from_fork,
        }
    }

    /// Changed files of a pull request, following pagination.
    pub async fn pull_request_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let mut changes = Vec::new();
        for page in 1..=network::GITHUB_MAX_PAGES {
            let files: Vec<PullFile> = self
                .send(
                    self.request(Method::GET, &format!("pulls/{}/files", number))
                        .query(&[("per_page", network::GITHUB_PAGE_SIZE), ("page", page)]),
                    &format!("files of pull request #{}", number),
                )
                .await?;
            let count = files.len();
            changes.extend(files.into_iter().filter_map(file_change));

            if count < network::GITHUB_PAGE_SIZE {
                return Ok(changes);
            }
        }
        warn!(
            "Pull request #{} lists more than {} files; the rest are ignored",
            number,
            network::GITHUB_PAGE_SIZE * network::GITHUB_MAX_PAGES
        );
        Ok(changes)
    }

    pub async fn default_branch(&self) -> Result<String> {
        let repo: RepoResponse = self
            .send(self.request(Method::GET, ""), &self.repository())
            .await?;
        Ok(repo.default_branch)
    }

    /// Head commit of `branch`, `None` when the branch does not exist
    pub async fn branch_head(&self, branch: &str) -> Result<Option<String>> {
        let reference: Option<RefResponse> = self
            .send_optional(self.request(Method::GET, &format!("git/ref/heads/{}", branch)))
            .await?;
        Ok(reference.map(|r| r.object.sha))
    }

    /// Open pull request whose head is `branch`
    pub async fn open_pull_for(&self, branch: &str) -> Result<Option<PullRequestInfo>> {
        let head = format!("{}:{}", self.owner, branch);
        let pulls: Vec<PullResponse> = self
            .send(
                self.request(Method::GET, "pulls")
                    .query(&[("head", head.as_str()), ("state", "open")]),
                "pull request list",
            )
            .await?;
        Ok(pulls.into_iter().next().map(|p| self.pull_info(p)))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    pub async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        let _: RefResponse = self
            .send(
                self.request(Method::POST, "git/refs").json(&serde_json::json!({
                    "ref": format!("refs/heads/{}", branch),
                    "sha": sha,
                })),
                "ref creation",
            )
            .await?;
        info!("Created branch {} at {}", branch, short_sha(sha));
        Ok(())
    }

    /// Commit `files` on top of `parent` and move `branch` to the new commit.
    pub async fn commit_files(
        &self,
        branch: &str,
        parent: &str,
        files: &[CommitFile],
        message: &str,
    ) -> Result<String> {
        let parent_commit: CommitResponse = self
            .send(
                self.request(Method::GET, &format!("git/commits/{}", parent)),
                &format!("commit {}", parent),
            )
            .await?;

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let blob: ShaObject = self
                .send(
                    self.request(Method::POST, "git/blobs").json(&serde_json::json!({
                        "content": file.content,
                        "encoding": "utf-8",
                    })),
                    "blob creation",
                )
                .await?;
            debug!("Blob {} for {}", short_sha(&blob.sha), file.path);
            entries.push(TreeEntry {
                path: &file.path,
                mode: "100644",
                kind: "blob",
                sha: blob.sha,
            });
        }

        let tree: ShaObject = self
            .send(
                self.request(Method::POST, "git/trees").json(&serde_json::json!({
                    "base_tree": parent_commit.tree.sha,
                    "tree": entries,
                })),
                "tree creation",
            )
            .await?;

        let commit: CommitResponse = self
            .send(
                self.request(Method::POST, "git/commits").json(&serde_json::json!({
                    "message": message,
                    "tree": tree.sha,
                    "parents": [parent],
                })),
                "commit creation",
            )
            .await?;

        let _: RefResponse = self
            .send(
                self.request(Method::PATCH, &format!("git/refs/heads/{}", branch))
                    .json(&serde_json::json!({ "sha": commit.sha, "force": false })),
                &format!("branch {}", branch),
            )
            .await?;

        info!(
            "Committed {} file(s) to {} as {}",
            files.len(),
            branch,
            short_sha(&commit.sha)
        );
        Ok(commit.sha)
    }

    pub async fn create_pull(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestInfo> {
        let pull: PullResponse = self
            .send(
                self.request(Method::POST, "pulls").json(&serde_json::json!({
                    "title": title,
                    "body": body,
                    "head": head,
                    "base": base,
                })),
                "pull request creation",
            )
            .await?;
        Ok(self.pull_info(pull))
    }

    pub async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let _: serde_json::Value = self
            .send(
                self.request(Method::POST, &format!("issues/{}/labels", number))
                    .json(&serde_json::json!({ "labels": labels })),
                "labels",
            )
            .await?;
        Ok(())
    }

    pub async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        let _: serde_json::Value = self
            .send(
                self.request(Method::POST, &format!("pulls/{}/requested_reviewers", number))
                    .json(&serde_json::json!({ "reviewers": reviewers })),
                "reviewers",
            )
            .await?;
        Ok(())
    }
}

fn required(value: Option<&str>, key: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DocsmithError::Config(format!("{} is required for GitHub access", key)))
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Convert one listed file. Files without a patch that still report line
/// changes (binary or too large to inline) count as changed everywhere.
/// Renames and copies without content changes have no changed lines.
fn file_change(file: PullFile) -> Option<FileChange> {
    let Some(status) = ChangeStatus::from_github(&file.status) else {
        debug!("Ignoring {} with status {}", file.filename, file.status);
        return None;
    };
    let ranges = match file.patch.as_deref() {
        Some(patch) => parse_patch(patch),
        None if status == ChangeStatus::Removed => Vec::new(),
        None if file.changes == Some(0) => Vec::new(),
        None if file.changes.is_none()
            && matches!(status, ChangeStatus::Renamed | ChangeStatus::Copied) =>
        {
            Vec::new()
        }
        None => vec![LineRange::new(1, u32::MAX)],
    };
    Some(FileChange {
        path: file.filename,
        previous_path: file.previous_filename,
        status,
        ranges,
    })
}

// =============================================================================
// Change Source
// =============================================================================

/// Changed lines of one pull request
pub struct PullRequestChanges {
    client: Arc<GitHubClient>,
    number: u64,
}

impl PullRequestChanges {
    pub fn new(client: Arc<GitHubClient>, number: u64) -> Self {
        Self { client, number }
    }
}

#[async_trait]
impl ChangeSource for PullRequestChanges {
    async fn change_set(&self) -> Result<ChangeSet> {
        let changes = self.client.pull_request_files(self.number).await?;
        info!(
            "Pull request #{} changes {} file(s)",
            self.number,
            changes.len()
        );
        Ok(ChangeSet::from_changes(changes))
    }

    fn describe(&self) -> String {
        format!("pull request #{}", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GitHubConfig {
        GitHubConfig {
            owner: Some("acme".to_string()),
            repo: Some("widgets".to_string()),
            token: Some("ghp_secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_owner_and_repo() {
        let mut config = config();
        config.owner = None;
        assert!(matches!(
            GitHubClient::new(&config),
            Err(DocsmithError::Config(_))
        ));
    }

    #[test]
    fn test_token_redacted_and_urls() {
        let client = GitHubClient::new(&config()).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ghp_secret"));
        assert_eq!(client.repository(), "acme/widgets");
        assert_eq!(
            client.url("pulls/3/files"),
            "https://api.github.com/repos/acme/widgets/pulls/3/files"
        );
        assert_eq!(client.url(""), "https://api.github.com/repos/acme/widgets");
    }

    #[test]
    fn test_file_change_conversion() {
        let files: Vec<PullFile> = serde_json::from_str(
            r#"[
                {"filename": "src/a.ts", "status": "modified", "patch": "@@ -1,2 +1,3 @@\n a\n+b\n c"},
                {"filename": "src/big.ts", "status": "added", "additions": 9000, "deletions": 0, "changes": 9000},
                {"filename": "src/c.ts", "status": "renamed", "previous_filename": "src/old.ts",
                 "additions": 0, "deletions": 0, "changes": 0},
                {"filename": "src/d.ts", "status": "unchanged"},
                {"filename": "src/e.ts", "status": "renamed", "previous_filename": "src/huge.ts",
                 "additions": 4000, "deletions": 10, "changes": 4010}
            ]"#,
        )
        .unwrap();
        let changes: Vec<FileChange> = files.into_iter().filter_map(file_change).collect();

        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0].ranges, vec![LineRange::single(2)]);
        assert_eq!(changes[1].ranges, vec![LineRange::new(1, u32::MAX)]);
        assert_eq!(changes[2].previous_path.as_deref(), Some("src/old.ts"));
        assert!(changes[2].ranges.is_empty());
        assert_eq!(changes[3].ranges, vec![LineRange::new(1, u32::MAX)]);
    }

    #[test]
    fn test_pull_info_detects_fork() {
        let client = GitHubClient::new(&config()).unwrap();
        let pull: PullResponse = serde_json::from_str(
            r#"{"number": 7, "html_url": "https://github.com/acme/widgets/pull/7",
                "head": {"ref": "feature", "sha": "abc", "repo": {"full_name": "someone/widgets"}},
                "base": {"ref": "main", "sha": "def", "repo": {"full_name": "acme/widgets"}}}"#,
        )
        .unwrap();
        let info = client.pull_info(pull);
        assert!(info.from_fork);
        assert_eq!(info.head_ref, "feature");
        assert_eq!(info.base_ref, "main");
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }
}
