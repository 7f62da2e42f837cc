mod edit;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::paths::paths;

pub use edit::cmd_config;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Optional settings read from `config.toml`.
///
/// Every key may be omitted. The access token is never read from this file.
///
/// Example TOML:
/// ```toml
/// owner     = "octocat"
/// repo      = "notes"
/// posts_dir = "_posts"
/// write_via = "clone"
///
/// [author]
/// name  = "Wiki Bot"
/// email = "wiki-bot@example.com"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub posts_dir: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub write_via: Option<WriteVia>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub author: Option<Identity>,
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Which gateway persists writes. Reads always go through the content API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteVia {
    #[default]
    Api,
    Clone,
}

impl FromStr for WriteVia {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(WriteVia::Api),
            "clone" => Ok(WriteVia::Clone),
            other => Err(format!("unknown write mode '{}' (expected api or clone)", other)),
        }
    }
}

/// Commit author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Identity {
            name: "gitpost".to_string(),
            email: "gitpost@users.noreply.github.com".to_string(),
        }
    }
}

/// Fully resolved settings used to build a [`crate::Store`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub api_base: String,
    pub posts_dir: String,
    pub extension: String,
    pub write_via: WriteVia,
    pub branch: Option<String>,
    pub remote_url: String,
    pub author: Identity,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
}

/// Environment variables consulted for each required setting, in priority order.
const OWNER_VARS: &[&str] = &["GITPOST_OWNER", "VERCEL_GIT_REPO_OWNER"];
const REPO_VARS: &[&str] = &["GITPOST_REPO", "VERCEL_GIT_REPO_SLUG"];
const TOKEN_VARS: &[&str] = &["GITPOST_TOKEN", "GITHUB_TOKEN"];

fn first_set(env: &impl Fn(&str) -> Option<String>, vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|v| env(*v))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    /// Merge file settings with environment lookups. Environment wins.
    ///
    /// # Errors
    /// Returns [`StoreError::ConfigurationMissing`] naming every required
    /// setting (owner, repo, token) that is absent or blank, or an invalid
    /// `GITPOST_WRITE_VIA`.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        scratch_default: PathBuf,
    ) -> StoreResult<Settings> {
        let owner = first_set(&env, OWNER_VARS).or_else(|| non_blank(file.owner));
        let repo = first_set(&env, REPO_VARS).or_else(|| non_blank(file.repo));
        let token = first_set(&env, TOKEN_VARS);

        let mut missing = Vec::new();
        if owner.is_none() {
            missing.push(format!("repository owner ({})", OWNER_VARS.join(" or ")));
        }
        if repo.is_none() {
            missing.push(format!("repository name ({})", REPO_VARS.join(" or ")));
        }
        if token.is_none() {
            missing.push(format!("access token ({})", TOKEN_VARS.join(" or ")));
        }

        let write_via = match env("GITPOST_WRITE_VIA") {
            Some(v) => match v.parse::<WriteVia>() {
                Ok(w) => w,
                Err(e) => {
                    missing.push(format!("GITPOST_WRITE_VIA: {}", e));
                    WriteVia::Api
                }
            },
            None => file.write_via.unwrap_or_default(),
        };

        let (Some(owner), Some(repo), Some(token)) = (owner, repo, token) else {
            return Err(StoreError::ConfigurationMissing(missing));
        };
        if !missing.is_empty() {
            return Err(StoreError::ConfigurationMissing(missing));
        }

        let remote_url = non_blank(file.remote_url)
            .unwrap_or_else(|| format!("https://github.com/{}/{}.git", owner, repo));

        Ok(Settings {
            api_base: non_blank(file.api_base)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            posts_dir: non_blank(file.posts_dir)
                .unwrap_or_else(|| "_posts".to_string())
                .trim_matches('/')
                .to_string(),
            extension: non_blank(file.extension)
                .unwrap_or_else(|| "md".to_string())
                .trim_start_matches('.')
                .to_string(),
            write_via,
            branch: non_blank(file.branch),
            remote_url,
            author: file.author.unwrap_or_default(),
            scratch_dir: file.scratch_dir.unwrap_or(scratch_default),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(30)),
            owner,
            repo,
            token,
        })
    }

    /// Load `config.toml` (if present) and the process environment.
    ///
    /// # Notes
    /// - A missing config file is not an error; the environment alone may be enough.
    /// - An unreadable or malformed file is reported as a configuration failure.
    pub fn load() -> StoreResult<Settings> {
        let p = paths();
        let file = read_file_config(&p.config)?;
        Settings::resolve(file, |k| std::env::var(k).ok(), p.scratch)
    }
}

fn read_file_config(path: &Path) -> StoreResult<FileConfig> {
    let txt = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => {
            return Err(StoreError::ConfigurationMissing(vec![format!(
                "readable {} ({})",
                path.display(),
                e
            )]));
        }
    };
    toml::from_str(&txt).map_err(|e| {
        StoreError::ConfigurationMissing(vec![format!("valid {} ({})", path.display(), e)])
    })
}
