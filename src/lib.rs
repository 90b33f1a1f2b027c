//! docsmith - Documentation Coverage and Patching for TypeScript Codebases
//!
//! Walks a repository, extracts documentable declarations with tree-sitter,
//! decides which ones lack documentation or have gone stale, asks an LLM
//! backend for doc comments and patches them back into the source without
//! disturbing anything else.
//!
//! ## Pipeline
//!
//! 1. **Traversal**: gitignore-aware walk with directory and file exclusions
//! 2. **Extraction**: declarations, signatures and existing doc comments
//! 3. **Coverage**: full-scan or incremental (pull request / git diff) verdicts
//! 4. **Generation**: bounded concurrency, retries with backoff
//! 5. **Patching**: verbatim-preserving edits at declaration boundaries
//! 6. **Delivery**: dry-run diffs, in-place writes or a pull request
//!
//! ## Quick Start
//!
//! ```ignore
//! use docsmith::{Config, Pipeline, RunMode, DryRunSink};
//!
//! let config = Config::default();
//! let pipeline = Pipeline::new(&config, None, Arc::new(DryRunSink), CancellationToken::new());
//! let run = pipeline.run(RunMode::FullScan).await?;
//! println!("{} declaration(s) need documentation", run.verdicts.generate);
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: Traversal, tree-sitter extraction and coverage verdicts
//! - [`ai`]: LLM providers, prompts, output validation and the generation client
//! - [`patch`]: Doc comment formatting, source edits and diffs
//! - [`vcs`]: Change sets from GitHub pull requests and local git diffs
//! - [`pipeline`]: Orchestration, reports and delivery sinks
//! - [`config`]: Layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod patch;
pub mod pipeline;
pub mod types;
pub mod vcs;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{DocsmithError, ErrorCategory, Result};

// Domain Types
pub use types::{Declaration, DeclarationKind, LineRange, SourceFile};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    ChangeSink, DiskSink, DryRunSink, Pipeline, PipelineRun, PullRequestSink, RunMode,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{DocProvider, GenerationClient, GenerationSettings, create_provider};

// =============================================================================
// Analyzer Re-exports
// =============================================================================

pub use analyzer::{
    CoverageVerdict, VerdictKind,
    parser::{Language, TypeScriptParser},
    scanner::FileScanner,
};

// =============================================================================
// VCS Re-exports
// =============================================================================

pub use vcs::{ChangeSet, ChangeSource, GitHubClient, LocalGitDiff};
