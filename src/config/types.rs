//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/docsmith/) and project (.docsmith.toml) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{generation, network, patch, traversal};
use crate::types::{DocsmithError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Where the analyzed tree lives
    pub project: ProjectConfig,

    /// Directory walk and exclusion rules
    pub traversal: TraversalConfig,

    /// Feature toggles
    pub features: FeatureConfig,

    /// Generation backend settings
    pub llm: LlmConfig,

    /// Comment rendering
    pub comments: CommentConfig,

    /// Pull-request collaborator settings
    pub github: GitHubConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            project: ProjectConfig::default(),
            traversal: TraversalConfig::default(),
            features: FeatureConfig::default(),
            llm: LlmConfig::default(),
            comments: CommentConfig::default(),
            github: GitHubConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DocsmithError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DocsmithError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DocsmithError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.concurrency == 0 {
            return Err(DocsmithError::Config(
                "LLM concurrency must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_attempts == 0 {
            return Err(DocsmithError::Config(
                "LLM max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.comments.wrap_width < 20 {
            return Err(DocsmithError::Config(format!(
                "comments.wrap_width must be at least 20, got {}",
                self.comments.wrap_width
            )));
        }

        if self.features.generate_summary_doc && self.features.summary_path.trim().is_empty() {
            return Err(DocsmithError::Config(
                "features.summary_path must be set when generate_summary_doc is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Project Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Root directory to analyze (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Location of the root inside the repository, `/`-separated, empty at top level.
    /// Change sets and commits use repository paths; this maps between the two.
    pub repository_prefix: String,
}

impl ProjectConfig {
    /// Repository path for a root-relative path
    pub fn repository_path(&self, relative: &str) -> String {
        let prefix = self.repository_prefix.trim_matches('/');
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", prefix, relative)
        }
    }
}

// =============================================================================
// Traversal Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Directory names pruned wherever they appear
    pub exclude_dirs: Vec<String>,

    /// Exact file names never analyzed
    pub exclude_files: Vec<String>,

    /// Recognized source extensions (without dot)
    pub extensions: Vec<String>,

    /// File name suffixes analyzed but never patched
    pub generated_suffixes: Vec<String>,

    /// Honor .gitignore files while walking
    pub respect_gitignore: bool,

    /// Files larger than this (bytes) are skipped
    pub max_file_size: u64,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: to_strings(traversal::DEFAULT_EXCLUDED_DIRS),
            exclude_files: Vec::new(),
            extensions: to_strings(traversal::SOURCE_EXTENSIONS),
            generated_suffixes: to_strings(traversal::GENERATED_SUFFIXES),
            respect_gitignore: true,
            max_file_size: traversal::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

// =============================================================================
// Feature Toggles
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Generate and patch documentation comments
    pub generate_code_comments: bool,

    /// Render a markdown summary of documented declarations
    pub generate_summary_doc: bool,

    /// Root-relative path of the summary document
    pub summary_path: String,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            generate_code_comments: true,
            generate_summary_doc: false,
            summary_path: "docs/API_SUMMARY.md".to_string(),
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Note: `api_key` is never serialized to output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type: "openai", "ollama"
    pub provider: String,
    pub model: Option<String>,
    pub api_base: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Size of the request worker pool
    pub concurrency: usize,
    /// Attempts per declaration, first try included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
    pub context_lines_before: u32,
    pub context_max_lines: u32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            max_tokens: 1024,
            concurrency: generation::DEFAULT_CONCURRENCY,
            max_attempts: generation::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: generation::BASE_DELAY_MS,
            max_delay_secs: generation::MAX_DELAY_SECS,
            context_lines_before: generation::CONTEXT_LINES_BEFORE,
            context_max_lines: generation::CONTEXT_MAX_LINES,
        }
    }
}

// =============================================================================
// Comment Rendering
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    /// Wrap generated prose at this column (indentation included)
    pub wrap_width: usize,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            wrap_width: patch::DEFAULT_WRAP_WIDTH,
        }
    }
}

// =============================================================================
// GitHub Configuration
// =============================================================================

/// Note: `token` is never serialized to output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_base: String,
    /// Prefix of branches created for generated documentation
    pub branch_prefix: String,
    /// Base branch for full-scan pull requests (defaults to the repository default)
    pub base_branch: Option<String>,
    pub labels: Vec<String>,
    pub reviewers: Vec<String>,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("branch_prefix", &self.branch_prefix)
            .field("base_branch", &self.base_branch)
            .field("labels", &self.labels)
            .field("reviewers", &self.reviewers)
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            api_base: network::GITHUB_API_BASE.to_string(),
            branch_prefix: "docsmith".to_string(),
            base_branch: None,
            labels: vec!["documentation".to_string()],
            reviewers: Vec::new(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
