use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use crate::paths::paths;

const TEMPLATE: &str = r#"# gitpost configuration.
# The access token is read from GITPOST_TOKEN or GITHUB_TOKEN only.

# owner     = "octocat"
# repo      = "notes"
# posts_dir = "_posts"
# extension = "md"
# write_via = "api"      # or "clone"
# branch    = "main"     # default: the remote's default branch
# timeout_secs = 30

# [author]
# name  = "gitpost"
# email = "gitpost@users.noreply.github.com"
"#;

/// Open `config.toml` in `$EDITOR` (default `vim`), creating it from a template first.
pub fn cmd_config() -> Result<()> {
    let config_path = paths().config;
    write_template_if_missing(&config_path)?;

    let editor_env = env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

    let mut cmd = Command::new(&editor_env);
    cmd.arg(&config_path);

    // -n: no swap file
    let is_vim = Path::new(&editor_env)
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("vim"))
        .unwrap_or(false);

    if is_vim {
        cmd.arg("-n");
    }

    let err = cmd.exec();
    Err(err).context(format!("failed to launch editor: {}", editor_env))
}

fn write_template_if_missing(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir: {}", parent.display()))?;
    }
    fs::write(path, TEMPLATE).with_context(|| format!("write template: {}", path.display()))
}
