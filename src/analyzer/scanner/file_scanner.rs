use ignore::{Walk, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TraversalConfig;
use crate::types::{DocsmithError, Result};

/// Walks a root directory and yields candidate source files.
///
/// Excluded directory names prune their whole subtree; excluded file names
/// are matched exactly against the final path component.
pub struct FileScanner {
    root: PathBuf,
    exclude_dirs: Arc<HashSet<String>>,
    exclude_files: Arc<HashSet<String>>,
    extensions: HashSet<String>,
    max_file_size: u64,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::from_config(root, &TraversalConfig::default())
    }

    pub fn from_config<P: AsRef<Path>>(root: P, config: &TraversalConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude_dirs: Arc::new(config.exclude_dirs.iter().cloned().collect()),
            exclude_files: Arc::new(config.exclude_files.iter().cloned().collect()),
            extensions: config.extensions.iter().cloned().collect(),
            max_file_size: config.max_file_size,
            respect_gitignore: config.respect_gitignore,
        }
    }

    pub fn with_exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.exclude_dirs = Arc::new(dirs.into_iter().collect());
        self
    }

    pub fn with_exclude_files(mut self, files: Vec<String>) -> Self {
        self.exclude_files = Arc::new(files.into_iter().collect());
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a lazy walk. Fails only when the root itself cannot be read.
    pub fn scan(&self) -> Result<SourceWalk> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| DocsmithError::RootUnreadable {
            path: self.root.clone(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(DocsmithError::RootUnreadable {
                path: self.root.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "root is not a directory",
                ),
            });
        }
        std::fs::read_dir(&self.root).map_err(|e| DocsmithError::RootUnreadable {
            path: self.root.clone(),
            source: e,
        })?;

        let exclude_dirs = Arc::clone(&self.exclude_dirs);
        let exclude_files = Arc::clone(&self.exclude_files);

        let walk = WalkBuilder::new(&self.root)
            .hidden(false)
            .ignore(false)
            .parents(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .follow_links(false) // Symlink cycles are out of scope
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let Some(name) = entry.file_name().to_str() else {
                    return true;
                };
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    !exclude_dirs.contains(name)
                } else {
                    !exclude_files.contains(name)
                }
            })
            .build();

        Ok(SourceWalk {
            inner: walk,
            extensions: self.extensions.clone(),
            max_file_size: self.max_file_size,
        })
    }

    /// Collect every walkable source path, dropping unreadable entries.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.scan()?.filter_map(|e| e.ok()).map(|f| f.path).collect())
    }
}

/// Lazy iterator over source files
pub struct SourceWalk {
    inner: Walk,
    extensions: HashSet<String>,
    max_file_size: u64,
}

impl Iterator for SourceWalk {
    type Item = std::result::Result<ScannedFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    return Some(Err(ScanError {
                        path: error_path(&err),
                        message: err.to_string(),
                    }));
                }
            };

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let path = entry.path();
            let recognized = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| self.extensions.contains(ext))
                .unwrap_or(false);
            if !recognized {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    return Some(Err(ScanError {
                        path: Some(path.to_path_buf()),
                        message: err.to_string(),
                    }));
                }
            };
            if size > self.max_file_size {
                tracing::debug!("Skipping {} ({} bytes over limit)", path.display(), size);
                continue;
            }

            return Some(Ok(ScannedFile {
                path: path.to_path_buf(),
                size,
            }));
        }
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// An entry the walker could not read
#[derive(Debug, Clone)]
pub struct ScanError {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// True for generated type-definition files such as `index.d.ts`
pub fn is_generated_file(relative_path: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|s| relative_path.ends_with(s.as_str()))
}
