//! Config Command
//!
//! Inspect and initialize docsmith configuration.
//!
//! Usage:
//!   docsmith config show [-f toml|json]
//!   docsmith config path
//!   docsmith config init [--force]

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the effective configuration (defaults, global, project, environment)
pub fn show(root: Option<PathBuf>, format: &str) -> Result<()> {
    let ctx = CommandContext::load(root)?;
    println!("{}", ConfigLoader::render(&ctx.config, format == "json")?);
    Ok(())
}

/// Show configuration paths
pub fn path(root: Option<PathBuf>) -> Result<()> {
    let ctx = CommandContext::load(root)?;
    let out = Output::new();

    match ConfigLoader::global_config_path() {
        Some(global) => out.stat("Global", marked(&global)),
        None => out.stat("Global", "(no config directory)"),
    }
    out.stat("Project", marked(&ConfigLoader::project_config_path(&ctx.root)));
    Ok(())
}

/// Write a default project config at the root
pub fn init(root: Option<PathBuf>, force: bool) -> Result<()> {
    let ctx = CommandContext::load(root)?;
    let out = Output::new();
    let path = ConfigLoader::project_config_path(&ctx.root);

    if ConfigLoader::init_project(&ctx.root, force)? {
        out.success(&format!("Created {}", path.display()));
    } else {
        out.warning(&format!(
            "{} already exists. Use --force to overwrite",
            path.display()
        ));
    }
    Ok(())
}

fn marked(path: &std::path::Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_respects_force() {
        let dir = TempDir::new().unwrap();
        let root = Some(dir.path().to_path_buf());
        let config_path = ConfigLoader::project_config_path(dir.path());

        init(root.clone(), false).unwrap();
        assert!(config_path.exists());

        std::fs::write(&config_path, "version = \"1.0\"\n").unwrap();
        init(root.clone(), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&config_path).unwrap(),
            "version = \"1.0\"\n"
        );

        init(root, true).unwrap();
        assert!(
            std::fs::read_to_string(&config_path)
                .unwrap()
                .contains("[features]")
        );
    }

    #[test]
    fn test_marked_flags_missing_paths() {
        let dir = TempDir::new().unwrap();
        assert!(marked(&dir.path().join("missing.toml")).ends_with("(not found)"));
        assert_eq!(marked(dir.path()), dir.path().display().to_string());
    }
}
