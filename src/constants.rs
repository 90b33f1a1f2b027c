//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Traversal constants
pub mod traversal {
    /// Maximum file size to analyze (1MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

    /// Source extensions handled by the TypeScript-family extractor
    pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "tsx", "js", "mjs", "cjs", "jsx"];

    /// Directories skipped unless the configuration says otherwise
    pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        "out",
        ".next",
        "vendor",
    ];

    /// Generated type-definition files: analyzed but never patched
    pub const GENERATED_SUFFIXES: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];
}

/// Generation client constants
pub mod generation {
    /// Concurrent in-flight backend requests
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// Attempts per declaration, first try included
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Extra full requests issued when the backend output fails validation
    pub const INVALID_OUTPUT_RETRIES: u32 = 1;

    /// Lines of code shown above the declaration header
    pub const CONTEXT_LINES_BEFORE: u32 = 6;

    /// Maximum lines of the declaration itself sent as context
    pub const CONTEXT_MAX_LINES: u32 = 80;

    /// Hard cap on context characters
    pub const CONTEXT_MAX_CHARS: usize = 8_000;

    /// Maximum characters accepted from the backend
    pub const MAX_OUTPUT_CHARS: usize = 4_000;
}

/// Patch writer constants
pub mod patch {
    /// Column at which generated comment lines are wrapped
    pub const DEFAULT_WRAP_WIDTH: usize = 100;

    /// Lines of context around each hunk in dry-run diffs
    pub const DIFF_CONTEXT_LINES: u32 = 2;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// GitHub REST API base
    pub const GITHUB_API_BASE: &str = "https://api.github.com";

    /// Files per page for the pull-request files endpoint
    pub const GITHUB_PAGE_SIZE: usize = 100;

    /// The files endpoint stops after this many pages (3000 files)
    pub const GITHUB_MAX_PAGES: usize = 30;
}
