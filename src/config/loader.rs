//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/docsmith/config.toml)
//! 3. Project config (<root>/.docsmith.toml)
//! 4. Environment variables (DOCSMITH_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{DocsmithError, Result};

/// Project config file name, looked up in the analyzed root
pub const PROJECT_CONFIG_FILE: &str = ".docsmith.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load(root: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path(root);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. DOCSMITH_LLM__MODEL -> llm.model, DOCSMITH_FEATURES__GENERATE_SUMMARY_DOC
        figment = figment.merge(Env::prefixed("DOCSMITH_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| DocsmithError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| DocsmithError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (platform config dir + docsmith)
    pub fn global_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docsmith").map(|d| d.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| DocsmithError::Config(e.to_string()))
        }
    }

    /// Write a commented default project config. Returns false if one exists and
    /// `force` is not set.
    pub fn init_project(root: &Path, force: bool) -> Result<bool> {
        let path = Self::project_config_path(root);
        if path.exists() && !force {
            info!("Project config exists: {}", path.display());
            return Ok(false);
        }
        fs::write(&path, Self::default_project_config())?;
        info!("Created project config: {}", path.display());
        Ok(true)
    }

    fn default_project_config() -> String {
        r#"# docsmith project configuration
# Values here override ~/.config/docsmith/config.toml; DOCSMITH_* variables override both.

version = "1.0"

[traversal]
exclude_dirs = ["node_modules", ".git", "dist", "build", "coverage"]
exclude_files = []
respect_gitignore = true

[features]
generate_code_comments = true
generate_summary_doc = false
summary_path = "docs/API_SUMMARY.md"

[llm]
provider = "openai"
concurrency = 4
max_attempts = 4

[github]
labels = ["documentation"]
reviewers = []
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.version, "1.0");
        assert!(config.features.generate_code_comments);
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            "[traversal]\nexclude_dirs = [\"generated\"]\n\n[llm]\nconcurrency = 2\n",
        )
        .unwrap();

        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.traversal.exclude_dirs, vec!["generated".to_string()]);
        assert_eq!(config.llm.concurrency, 2);
        // untouched sections keep defaults
        assert!(config.traversal.respect_gitignore);
    }

    #[test]
    fn test_invalid_project_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "[llm]\nmax_attempts = 0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_init_project_respects_existing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ConfigLoader::init_project(temp_dir.path(), false).unwrap());
        assert!(!ConfigLoader::init_project(temp_dir.path(), false).unwrap());

        let config =
            ConfigLoader::load_from_file(&ConfigLoader::project_config_path(temp_dir.path()))
                .unwrap();
        assert_eq!(config.llm.provider, "openai");
    }
}
